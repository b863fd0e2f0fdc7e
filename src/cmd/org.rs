//! Organization, member and invite commands.

use anyhow::{Result, anyhow};
use console::style;

use nexusflow::Store;
use nexusflow::config::ClientConfig;
use nexusflow::models::{InviteRole, InviteStatus, OrgRole};
use nexusflow::validation;

use super::super::{InviteCommands, MemberCommands, OrgCommands};
use super::{load_organization, parse_arg};

pub async fn cmd_orgs(store: &Store, command: OrgCommands) -> Result<()> {
    store.fetch_organizations().await;

    match command {
        OrgCommands::List => {
            let state = store.snapshot();
            if state.organizations.is_empty() {
                println!("No organizations.");
                return Ok(());
            }
            for org in &state.organizations {
                println!(
                    "  {:<20} {}  {}",
                    style(&org.slug).cyan(),
                    org.name,
                    style(&org.id).dim()
                );
            }
        }
        OrgCommands::Create {
            name,
            slug,
            description,
        } => {
            let slug = slug.unwrap_or_else(|| validation::derive_slug(&name));
            let new_org = validation::organization(&name, &slug, description.as_deref())?;
            let created = store.create_organization(new_org).await?;
            println!(
                "{} Created organization {} ({})",
                style("✓").green(),
                created.name,
                style(&created.slug).cyan()
            );
        }
    }

    Ok(())
}

pub async fn cmd_members(
    store: &Store,
    config: &ClientConfig,
    command: MemberCommands,
) -> Result<()> {
    let org = load_organization(store, config).await?;
    store.fetch_members(&org.id).await;

    match command {
        MemberCommands::List => {
            let members = store.snapshot().members;
            if members.is_empty() {
                println!("No members in {}.", org.name);
                return Ok(());
            }
            for member in &members {
                println!(
                    "  {:<8} {}  {}",
                    member.role.as_str(),
                    member.user_id,
                    style(format!("joined {}", member.joined_at.format("%Y-%m-%d"))).dim()
                );
            }
        }
        MemberCommands::Role { member, role } => {
            let member_id = find_member(store, &member)?;
            let role = parse_arg::<OrgRole>(&role)?;
            let updated = store.update_member_role(&org.id, &member_id, role).await?;
            println!(
                "{} {} is now {}",
                style("✓").green(),
                updated.user_id,
                updated.role.as_str()
            );
        }
        MemberCommands::Remove { member } => {
            let member_id = find_member(store, &member)?;
            store.remove_member(&org.id, &member_id).await?;
            println!("{} Removed member {}", style("✓").green(), member);
        }
    }

    Ok(())
}

pub async fn cmd_invites(
    store: &Store,
    config: &ClientConfig,
    command: InviteCommands,
) -> Result<()> {
    let org = load_organization(store, config).await?;
    store.fetch_invites(&org.id).await;

    match command {
        InviteCommands::List => {
            let invites = store.snapshot().invites;
            if invites.is_empty() {
                println!("No invites for {}.", org.name);
                return Ok(());
            }
            for invite in &invites {
                let status = match invite.status {
                    InviteStatus::Pending => style(invite.status.as_str()).yellow(),
                    InviteStatus::Accepted => style(invite.status.as_str()).green(),
                    InviteStatus::Expired | InviteStatus::Revoked => {
                        style(invite.status.as_str()).dim()
                    }
                };
                println!(
                    "  {:<30} {:<7} {:<9} {}",
                    invite.email,
                    invite.role.as_str(),
                    status,
                    style(&invite.id).dim()
                );
            }
        }
        InviteCommands::Send { email, role } => {
            let role = parse_arg::<InviteRole>(&role)?;
            let invite = store.invite_member(&org.id, &email, role).await?;
            println!(
                "{} Invited {} as {}",
                style("✓").green(),
                invite.email,
                invite.role.as_str()
            );
        }
        InviteCommands::Revoke { invite } => {
            let invite_id = store
                .snapshot()
                .invites
                .into_iter()
                .find(|i| i.id == invite || i.email == invite)
                .map(|i| i.id)
                .ok_or_else(|| anyhow!("Invite '{}' not found", invite))?;
            let revoked = store.revoke_invite(&org.id, &invite_id).await?;
            println!("{} Revoked invite for {}", style("✓").green(), revoked.email);
        }
    }

    Ok(())
}

/// Members are addressed by membership id or user id.
fn find_member(store: &Store, id: &str) -> Result<String> {
    store
        .snapshot()
        .members
        .into_iter()
        .find(|m| m.id == id || m.user_id == id)
        .map(|m| m.id)
        .ok_or_else(|| anyhow!("Member '{}' not found", id))
}
