use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nexusflow::config::{CliOverrides, ClientConfig};
use nexusflow::{HttpApi, Store};

mod cmd;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(version, about = "NexusFlow issue tracker client")]
pub struct Cli {
    /// Path to nexusflow.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the NexusFlow API
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token for the API
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Organization id to scope projects, members and invites
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Project id or key (defaults to the configured or first project)
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage issues in the selected project
    Issues {
        #[command(subcommand)]
        command: IssueCommands,
    },
    /// Show the kanban board for the selected project
    Board,
    /// List or create organizations
    Orgs {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// Manage organization members
    Members {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Manage organization invites
    Invites {
        #[command(subcommand)]
        command: InviteCommands,
    },
    /// Show resolved configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    List,
    Create {
        name: String,
        /// Short uppercase key (at most 5 characters)
        key: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    Update {
        /// Project id or key
        project: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        /// Project id or key
        project: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum IssueCommands {
    List,
    Create {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// LOW, MEDIUM, HIGH or URGENT
        #[arg(long, default_value = "MEDIUM")]
        priority: String,
        /// STORY, BUG, TASK or EPIC
        #[arg(long = "type", default_value = "TASK")]
        issue_type: String,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Move an issue to another column
    Move {
        /// Issue id or key
        issue: String,
        /// TODO, IN_PROGRESS or DONE
        status: String,
    },
    Delete {
        /// Issue id or key
        issue: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum OrgCommands {
    List,
    Create {
        name: String,
        /// Defaults to a slug derived from the name
        #[arg(long)]
        slug: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum MemberCommands {
    List,
    /// Change a member's role
    Role {
        member: String,
        /// owner, admin, member or guest
        role: String,
    },
    Remove {
        member: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum InviteCommands {
    List,
    Send {
        email: String,
        /// admin or member
        #[arg(long, default_value = "member")]
        role: String,
    },
    Revoke {
        invite: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "nexusflow=debug"
    } else {
        "nexusflow=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = ClientConfig::resolve(CliOverrides {
        config_path: cli.config.clone(),
        api_url: cli.api_url.clone(),
        token: cli.token.clone(),
        organization: cli.org.clone(),
        timeout_secs: cli.timeout,
    })
    .context("Failed to load configuration")?;

    let api = HttpApi::from_config(&config).context("Failed to create API client")?;
    let store = Store::new(Arc::new(api));
    let project = cli.project.as_deref().or(config.default_project.as_deref());

    match &cli.command {
        Commands::Projects { command } => cmd::cmd_projects(&store, &config, command.clone()).await?,
        Commands::Issues { command } => {
            cmd::cmd_issues(&store, &config, project, command.clone()).await?
        }
        Commands::Board => cmd::cmd_board(&store, &config, project).await?,
        Commands::Orgs { command } => cmd::cmd_orgs(&store, command.clone()).await?,
        Commands::Members { command } => {
            cmd::cmd_members(&store, &config, command.clone()).await?
        }
        Commands::Invites { command } => {
            cmd::cmd_invites(&store, &config, command.clone()).await?
        }
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
