//! Configuration view: `nexus config show`.

use anyhow::Result;

use nexusflow::config::{ClientConfig, ENV_API_URL, ENV_ORG, ENV_TIMEOUT, ENV_TOKEN};

use super::super::ConfigCommands;

pub fn cmd_config(config: &ClientConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("NexusFlow Configuration");
            println!("=======================");
            println!();

            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("Config file: (none)"),
            }
            println!();

            println!("  api_url = \"{}\"", config.api_url);
            println!(
                "  token = {}",
                quoted_or_unset(config.masked_token().as_deref())
            );
            println!(
                "  organization = {}",
                quoted_or_unset(config.organization.as_deref())
            );
            println!(
                "  default_project = {}",
                quoted_or_unset(config.default_project.as_deref())
            );
            match config.timeout_secs {
                Some(secs) => println!("  timeout_secs = {}", secs),
                None => println!("  timeout_secs = (not set)"),
            }
            println!();

            println!("Environment overrides:");
            for var in [ENV_API_URL, ENV_TOKEN, ENV_ORG, ENV_TIMEOUT] {
                println!("  {}", var);
            }
            println!();
        }
    }

    Ok(())
}

fn quoted_or_unset(value: Option<&str>) -> String {
    value
        .map(|v| format!("\"{}\"", v))
        .unwrap_or_else(|| "(not set)".to_string())
}
