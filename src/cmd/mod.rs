//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                      |
//! |-----------|---------------------------------------|
//! | `project` | `Projects`                            |
//! | `issue`   | `Issues`, `Board`                     |
//! | `org`     | `Orgs`, `Members`, `Invites`          |
//! | `config`  | `Config`                              |

pub mod config;
pub mod issue;
pub mod org;
pub mod project;

pub use config::cmd_config;
pub use issue::{cmd_board, cmd_issues};
pub use org::{cmd_invites, cmd_members, cmd_orgs};
pub use project::cmd_projects;

use anyhow::{Result, anyhow};

use nexusflow::Store;
use nexusflow::config::ClientConfig;
use nexusflow::models::{Organization, Project};

/// Fetch organizations and select the configured one (by id or slug), or
/// fall back to the first the server lists.
pub(crate) async fn load_organization(store: &Store, config: &ClientConfig) -> Result<Organization> {
    store.fetch_organizations().await;
    let state = store.snapshot();

    if let Some(wanted) = config.organization.as_deref() {
        let org = state
            .organizations
            .iter()
            .find(|o| o.id == wanted || o.slug == wanted)
            .ok_or_else(|| anyhow!("Organization '{}' not found", wanted))?;
        store.set_current_organization(&org.id)?;
        return Ok(org.clone());
    }

    state
        .current_organization
        .ok_or_else(|| anyhow!("No organizations found. Create one with `nexus orgs create`"))
}

/// Resolve the project a command works on: an explicit id or key, else the
/// first project of the organization.
pub(crate) async fn load_project(
    store: &Store,
    config: &ClientConfig,
    project: Option<&str>,
) -> Result<Project> {
    load_organization(store, config).await?;
    store.fetch_projects().await;

    match project {
        Some(wanted) => {
            let found = store
                .snapshot()
                .find_project(wanted)
                .cloned()
                .ok_or_else(|| anyhow!("Project '{}' not found", wanted))?;
            store.set_current_project(&found.id)?;
            Ok(found)
        }
        None => store
            .snapshot()
            .current_project
            .ok_or_else(|| anyhow!("No projects found. Create one with `nexus projects create`")),
    }
}

/// Parse a display-form enum value in either case.
pub(crate) fn parse_arg<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .to_uppercase()
        .parse::<T>()
        .or_else(|_| value.to_lowercase().parse::<T>())
        .map_err(anyhow::Error::msg)
}
