//! Project commands: `nexus projects list|create|update|delete`.

use anyhow::{Result, anyhow};
use console::style;

use nexusflow::Store;
use nexusflow::config::ClientConfig;
use nexusflow::models::ProjectPatch;
use nexusflow::validation;

use super::super::ProjectCommands;
use super::load_organization;

pub async fn cmd_projects(
    store: &Store,
    config: &ClientConfig,
    command: ProjectCommands,
) -> Result<()> {
    let org = load_organization(store, config).await?;
    store.fetch_projects().await;

    match command {
        ProjectCommands::List => {
            let state = store.snapshot();
            if state.projects.is_empty() {
                println!("No projects in {}.", org.name);
                return Ok(());
            }
            println!("Projects in {}:", style(&org.name).bold());
            for project in &state.projects {
                println!(
                    "  {:<8} {}  {}",
                    style(&project.key).cyan(),
                    project.name,
                    style(&project.id).dim()
                );
            }
        }
        ProjectCommands::Create {
            name,
            key,
            description,
        } => {
            let new_project = validation::project_form(&name, &key, description.as_deref())?;
            let created = store.create_project(new_project).await?;
            println!(
                "{} Created project {} ({})",
                style("✓").green(),
                style(&created.key).cyan(),
                created.name
            );
        }
        ProjectCommands::Update {
            project,
            name,
            key,
            description,
        } => {
            let existing = find(store, &project)?;
            if name.is_none() && key.is_none() && description.is_none() {
                anyhow::bail!("Nothing to update. Pass --name, --key or --description");
            }
            // Re-run the form rules on the merged values.
            let merged = validation::project_form(
                name.as_deref().unwrap_or(&existing.name),
                key.as_deref().unwrap_or(&existing.key),
                description.as_deref(),
            )?;
            let patch = ProjectPatch {
                name: name.map(|_| merged.name),
                key: key.map(|_| merged.key),
                description,
            };
            let updated = store.update_project(&existing.id, patch).await?;
            println!(
                "{} Updated project {} ({})",
                style("✓").green(),
                style(&updated.key).cyan(),
                updated.name
            );
        }
        ProjectCommands::Delete { project } => {
            let existing = find(store, &project)?;
            store.delete_project(&existing.id).await?;
            println!(
                "{} Deleted project {}",
                style("✓").green(),
                style(&existing.key).cyan()
            );
        }
    }

    Ok(())
}

fn find(store: &Store, id_or_key: &str) -> Result<nexusflow::models::Project> {
    store
        .snapshot()
        .find_project(id_or_key)
        .cloned()
        .ok_or_else(|| anyhow!("Project '{}' not found", id_or_key))
}
