//! Issue and board commands.

use anyhow::{Result, anyhow};
use console::style;

use nexusflow::Store;
use nexusflow::config::ClientConfig;
use nexusflow::models::{Issue, IssueStatus, IssueType, NewIssue, Priority};

use super::super::IssueCommands;
use super::{load_project, parse_arg};

pub async fn cmd_issues(
    store: &Store,
    config: &ClientConfig,
    project: Option<&str>,
    command: IssueCommands,
) -> Result<()> {
    let project = load_project(store, config, project).await?;
    store.fetch_issues(&project.id).await;

    match command {
        IssueCommands::List => {
            let issues = store.snapshot().issues;
            if issues.is_empty() {
                println!("No issues in {}.", project.key);
                return Ok(());
            }
            for issue in &issues {
                println!(
                    "{:<10} {:<12} {:<7} {:<6} {}",
                    style(&issue.key).cyan(),
                    issue.status.as_str(),
                    issue.priority.as_str(),
                    issue.issue_type.as_str(),
                    issue.title
                );
            }
        }
        IssueCommands::Create {
            title,
            description,
            priority,
            issue_type,
            assignee,
        } => {
            if title.trim().is_empty() {
                anyhow::bail!("Issue title is required");
            }
            let new_issue = NewIssue {
                title: title.trim().to_string(),
                description,
                status: IssueStatus::Todo,
                priority: parse_arg::<Priority>(&priority)?,
                issue_type: parse_arg::<IssueType>(&issue_type)?,
                assignee_id: assignee,
            };
            let created = store.create_issue(&project.id, new_issue).await?;
            println!(
                "{} Created {} {}",
                style("✓").green(),
                style(&created.key).cyan(),
                created.title
            );
        }
        IssueCommands::Move { issue, status } => {
            let issue = find(store, &issue)?;
            let status = parse_arg::<IssueStatus>(&status)?;
            if issue.status == status {
                println!("{} is already in {}", issue.key, status.title());
                return Ok(());
            }
            let pending = store.update_issue_status(&issue.id, status)?;
            let saved = pending.wait().await?;
            println!(
                "{} Moved {} to {}",
                style("✓").green(),
                style(&saved.key).cyan(),
                saved.status.title()
            );
        }
        IssueCommands::Delete { issue } => {
            let issue = find(store, &issue)?;
            store.delete_issue(&issue.id).await?;
            println!("{} Deleted {}", style("✓").green(), style(&issue.key).cyan());
        }
    }

    Ok(())
}

pub async fn cmd_board(store: &Store, config: &ClientConfig, project: Option<&str>) -> Result<()> {
    let project = load_project(store, config, project).await?;
    store.fetch_issues(&project.id).await;

    println!("{} {}", style(&project.key).cyan().bold(), project.name);
    for (status, issues) in store.board().iter() {
        println!();
        println!("{} ({})", style(status.title()).bold(), issues.len());
        if issues.is_empty() {
            println!("  {}", style("empty").dim());
        }
        for issue in issues {
            println!(
                "  {:<10} {} {}",
                style(&issue.key).cyan(),
                issue.title,
                style(format!("[{}]", issue.priority.as_str())).dim()
            );
        }
    }

    Ok(())
}

fn find(store: &Store, id_or_key: &str) -> Result<Issue> {
    store
        .snapshot()
        .issues
        .into_iter()
        .find(|i| i.id == id_or_key || i.key.eq_ignore_ascii_case(id_or_key))
        .ok_or_else(|| anyhow!("Issue '{}' not found", id_or_key))
}
