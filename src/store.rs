//! Application state store.
//!
//! `Store` owns the client's view of the server: current user, organization
//! scope, projects, the current project's issues, members and invites. All
//! mutation goes through its action methods; readers take a `snapshot()` or
//! `subscribe()` to `StoreEvent`s.
//!
//! Read actions (`fetch_*`) never fail from the caller's point of view: on
//! error the collection is emptied and the error is logged. Mutating actions
//! return the error and leave state untouched. The one exception is
//! `update_issue_status`, which applies the change locally first and
//! reconciles by refetching the issue list when the server rejects it.
//!
//! The state lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::Api;
use crate::board::{self, BoardColumns, DragResult, DropPlan};
use crate::errors::{ClientError, Result};
use crate::models::*;
use crate::validation;

const EVENT_CAPACITY: usize = 256;

/// Everything the client currently believes about the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub user: Option<User>,
    pub organizations: Vec<Organization>,
    pub current_organization: Option<Organization>,
    pub projects: Vec<Project>,
    pub current_project: Option<Project>,
    pub issues: Vec<Issue>,
    /// Project the `issues` collection was fetched for.
    pub issues_project_id: Option<String>,
    pub members: Vec<OrgMember>,
    pub invites: Vec<Invite>,
    pub loading: bool,
}

impl AppState {
    pub fn board(&self) -> BoardColumns {
        board::group_by_status(&self.issues)
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Look a project up by id or key.
    pub fn find_project(&self, id_or_key: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id_or_key || p.key.eq_ignore_ascii_case(id_or_key))
    }
}

/// Change notifications broadcast after every state mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    UserChanged,
    LoadingChanged {
        loading: bool,
    },
    OrganizationsReplaced {
        count: usize,
    },
    OrganizationCreated {
        organization_id: String,
    },
    CurrentOrganizationChanged {
        organization_id: Option<String>,
    },
    ProjectsReplaced {
        count: usize,
    },
    ProjectCreated {
        project_id: String,
    },
    ProjectUpdated {
        project_id: String,
    },
    ProjectDeleted {
        project_id: String,
    },
    CurrentProjectChanged {
        project_id: Option<String>,
    },
    IssuesReplaced {
        project_id: String,
        count: usize,
    },
    IssueCreated {
        issue_id: String,
    },
    IssueUpdated {
        issue_id: String,
    },
    IssueMoved {
        issue_id: String,
        from: IssueStatus,
        to: IssueStatus,
    },
    IssueDeleted {
        issue_id: String,
    },
    /// The issue list was refetched after a rejected optimistic change.
    IssuesReconciled {
        project_id: String,
    },
    MembersReplaced {
        count: usize,
    },
    MemberUpdated {
        member_id: String,
    },
    MemberRemoved {
        member_id: String,
    },
    InvitesReplaced {
        count: usize,
    },
    InviteCreated {
        invite_id: String,
    },
    InviteRevoked {
        invite_id: String,
    },
}

#[derive(Default)]
struct Inner {
    state: AppState,
    /// Bumped on every optimistic status change, keyed by issue id.
    generations: HashMap<String, u64>,
    in_flight: usize,
}

/// Handle to the asynchronous half of an optimistic status change.
///
/// The local change is already applied when this is returned. Awaiting
/// `wait()` yields the server's issue, or the server's error after the
/// issue list has been refetched.
pub struct PendingUpdate {
    pub issue_id: String,
    handle: JoinHandle<Result<Issue>>,
}

impl PendingUpdate {
    pub async fn wait(self) -> Result<Issue> {
        self.handle
            .await
            .map_err(|e| ClientError::TaskJoin(e.to_string()))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[derive(Clone)]
pub struct Store {
    api: Arc<dyn Api>,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Store {
    pub fn new(api: Arc<dyn Api>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            inner: Arc::new(Mutex::new(Inner::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> AppState {
        self.lock().state.clone()
    }

    pub fn board(&self) -> BoardColumns {
        self.lock().state.board()
    }

    // Critical sections are plain field assignments, so a panic elsewhere
    // cannot leave the state half-written.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn begin_load(&self) {
        let changed = self.update(|inner| {
            inner.in_flight += 1;
            let was = inner.state.loading;
            inner.state.loading = true;
            !was
        });
        if changed {
            self.emit(StoreEvent::LoadingChanged { loading: true });
        }
    }

    fn end_load(&self) {
        let changed = self.update(|inner| {
            inner.in_flight = inner.in_flight.saturating_sub(1);
            let now = inner.in_flight > 0;
            let changed = inner.state.loading != now;
            inner.state.loading = now;
            changed
        });
        if changed {
            self.emit(StoreEvent::LoadingChanged { loading: false });
        }
    }

    // ── Session scope ─────────────────────────────────────────────────

    pub fn set_user(&self, user: Option<User>) {
        self.update(|inner| inner.state.user = user);
        self.emit(StoreEvent::UserChanged);
    }

    /// Switch organization scope. Project, issue, member and invite
    /// collections belong to the previous scope and are cleared.
    pub fn set_current_organization(&self, organization_id: &str) -> Result<()> {
        let changed = self.update(|inner| {
            let org = inner
                .state
                .organizations
                .iter()
                .find(|o| o.id == organization_id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound {
                    entity: "Organization",
                    id: organization_id.to_string(),
                })?;
            let changed = inner.state.current_organization.as_ref().map(|o| &o.id) != Some(&org.id);
            if changed {
                let state = &mut inner.state;
                state.projects.clear();
                state.current_project = None;
                state.issues.clear();
                state.issues_project_id = None;
                state.members.clear();
                state.invites.clear();
            }
            inner.state.current_organization = Some(org);
            Ok::<_, ClientError>(changed)
        })?;
        if changed {
            self.emit(StoreEvent::CurrentOrganizationChanged {
                organization_id: Some(organization_id.to_string()),
            });
        }
        Ok(())
    }

    /// Select the project the board and issue list show. Issues held for a
    /// different project are dropped.
    pub fn set_current_project(&self, project_id: &str) -> Result<()> {
        let changed = self.update(|inner| {
            let project = inner
                .state
                .project(project_id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound {
                    entity: "Project",
                    id: project_id.to_string(),
                })?;
            let changed = inner.state.current_project.as_ref().map(|p| &p.id) != Some(&project.id);
            if inner.state.issues_project_id.as_deref() != Some(project_id) {
                inner.state.issues.clear();
                inner.state.issues_project_id = None;
            }
            inner.state.current_project = Some(project);
            Ok::<_, ClientError>(changed)
        })?;
        if changed {
            self.emit(StoreEvent::CurrentProjectChanged {
                project_id: Some(project_id.to_string()),
            });
        }
        Ok(())
    }

    fn current_organization_id(&self) -> Option<String> {
        self.lock()
            .state
            .current_organization
            .as_ref()
            .map(|o| o.id.clone())
    }

    // ── Organizations ─────────────────────────────────────────────────

    pub async fn fetch_organizations(&self) {
        self.begin_load();
        let result = self.api.list_organizations().await;
        let organizations = match result {
            Ok(orgs) => orgs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch organizations");
                Vec::new()
            }
        };
        let count = organizations.len();
        let current_changed = self.update(|inner| {
            let state = &mut inner.state;
            let before = state.current_organization.as_ref().map(|o| o.id.clone());
            state.current_organization = before
                .as_deref()
                .and_then(|id| organizations.iter().find(|o| o.id == id))
                .or_else(|| organizations.first())
                .cloned();
            state.organizations = organizations;
            let after = state.current_organization.as_ref().map(|o| o.id.clone());
            (before != after).then_some(after)
        });
        self.emit(StoreEvent::OrganizationsReplaced { count });
        if let Some(organization_id) = current_changed {
            self.emit(StoreEvent::CurrentOrganizationChanged { organization_id });
        }
        self.end_load();
    }

    pub async fn create_organization(&self, org: NewOrganization) -> Result<Organization> {
        let created = self.api.create_organization(&org).await?;
        let became_current = self.update(|inner| {
            inner.state.organizations.push(created.clone());
            if inner.state.current_organization.is_none() {
                inner.state.current_organization = Some(created.clone());
                true
            } else {
                false
            }
        });
        tracing::info!(organization_id = %created.id, slug = %created.slug, "Organization created");
        self.emit(StoreEvent::OrganizationCreated {
            organization_id: created.id.clone(),
        });
        if became_current {
            self.emit(StoreEvent::CurrentOrganizationChanged {
                organization_id: Some(created.id.clone()),
            });
        }
        Ok(created)
    }

    // ── Projects ──────────────────────────────────────────────────────

    /// Replace the project list for the current organization. The current
    /// project is kept when the server still lists it, otherwise the first
    /// project becomes current.
    pub async fn fetch_projects(&self) {
        self.begin_load();
        let org = self.current_organization_id();
        let projects = match self.api.list_projects(org.as_deref()).await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(error = %e, organization = ?org, "Failed to fetch projects");
                Vec::new()
            }
        };
        let count = projects.len();
        let current_changed = self.update(|inner| {
            let state = &mut inner.state;
            let before = state.current_project.as_ref().map(|p| p.id.clone());
            state.current_project = before
                .as_deref()
                .and_then(|id| projects.iter().find(|p| p.id == id))
                .or_else(|| projects.first())
                .cloned();
            state.projects = projects;
            let after = state.current_project.as_ref().map(|p| p.id.clone());
            if state.issues_project_id.is_some() && state.issues_project_id != after {
                state.issues.clear();
                state.issues_project_id = None;
            }
            (before != after).then_some(after)
        });
        self.emit(StoreEvent::ProjectsReplaced { count });
        if let Some(project_id) = current_changed {
            self.emit(StoreEvent::CurrentProjectChanged { project_id });
        }
        self.end_load();
    }

    /// Create a project in the current organization. The server's copy is
    /// what lands in the collection; it may normalize fields such as the key.
    pub async fn create_project(&self, mut project: NewProject) -> Result<Project> {
        if project.organization_id.is_none() {
            project.organization_id = self.current_organization_id();
        }
        let created = self.api.create_project(&project).await?;
        self.update(|inner| inner.state.projects.push(created.clone()));
        tracing::info!(project_id = %created.id, key = %created.key, "Project created");
        self.emit(StoreEvent::ProjectCreated {
            project_id: created.id.clone(),
        });
        Ok(created)
    }

    pub async fn update_project(&self, id: &str, patch: ProjectPatch) -> Result<Project> {
        let updated = self.api.update_project(id, &patch).await?;
        self.update(|inner| {
            let state = &mut inner.state;
            if let Some(slot) = state.projects.iter_mut().find(|p| p.id == updated.id) {
                *slot = updated.clone();
            }
            if let Some(current) = state.current_project.as_mut().filter(|p| p.id == updated.id) {
                *current = updated.clone();
            }
        });
        self.emit(StoreEvent::ProjectUpdated {
            project_id: updated.id.clone(),
        });
        Ok(updated)
    }

    /// Delete a project. Local state changes only once the server confirms.
    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.api.delete_project(id).await?;
        let current_changed = self.update(|inner| {
            let state = &mut inner.state;
            state.projects.retain(|p| p.id != id);
            if state.issues_project_id.as_deref() == Some(id) {
                state.issues.clear();
                state.issues_project_id = None;
            }
            if state.current_project.as_ref().is_some_and(|p| p.id == id) {
                state.current_project = state.projects.first().cloned();
                Some(state.current_project.as_ref().map(|p| p.id.clone()))
            } else {
                None
            }
        });
        tracing::info!(project_id = id, "Project deleted");
        self.emit(StoreEvent::ProjectDeleted {
            project_id: id.to_string(),
        });
        if let Some(project_id) = current_changed {
            self.emit(StoreEvent::CurrentProjectChanged { project_id });
        }
        Ok(())
    }

    // ── Issues ────────────────────────────────────────────────────────

    /// Replace the issue list with the server's list for `project_id`.
    ///
    /// A reply for a project other than the current one is dropped, so a
    /// slow fetch cannot repaint the board after the selection changed.
    pub async fn fetch_issues(&self, project_id: &str) {
        self.load_issues(project_id).await;
    }

    /// Returns whether the reply was applied.
    async fn load_issues(&self, project_id: &str) -> bool {
        self.begin_load();
        let issues = match self.api.list_issues(project_id).await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::error!(error = %e, project_id, "Failed to fetch issues");
                Vec::new()
            }
        };
        let count = issues.len();
        let applied = self.update(|inner| {
            let state = &mut inner.state;
            let in_scope = state
                .current_project
                .as_ref()
                .is_none_or(|p| p.id == project_id);
            if in_scope {
                state.issues = issues;
                state.issues_project_id = Some(project_id.to_string());
            }
            in_scope
        });
        if applied {
            self.emit(StoreEvent::IssuesReplaced {
                project_id: project_id.to_string(),
                count,
            });
        } else {
            tracing::debug!(project_id, "Dropping issue list for a project no longer selected");
        }
        self.end_load();
        applied
    }

    pub async fn create_issue(&self, project_id: &str, issue: NewIssue) -> Result<Issue> {
        let created = self.api.create_issue(project_id, &issue).await?;
        let appended = self.update(|inner| {
            let state = &mut inner.state;
            let in_scope = state
                .issues_project_id
                .as_deref()
                .is_none_or(|scope| scope == created.project_id);
            if in_scope {
                state.issues.push(created.clone());
                state.issues_project_id = Some(created.project_id.clone());
            }
            in_scope
        });
        tracing::info!(issue_id = %created.id, key = %created.key, "Issue created");
        if appended {
            self.emit(StoreEvent::IssueCreated {
                issue_id: created.id.clone(),
            });
        }
        Ok(created)
    }

    /// Non-optimistic partial update: local state changes only on success.
    pub async fn update_issue(&self, id: &str, patch: IssuePatch) -> Result<Issue> {
        let updated = self.api.update_issue(id, &patch).await?;
        self.update(|inner| {
            if let Some(slot) = inner.state.issues.iter_mut().find(|i| i.id == updated.id) {
                *slot = updated.clone();
            }
        });
        self.emit(StoreEvent::IssueUpdated {
            issue_id: updated.id.clone(),
        });
        Ok(updated)
    }

    /// Optimistic status change.
    ///
    /// The local issue is moved to `status` before this returns; the persist
    /// call runs on a spawned task. On failure that task refetches the
    /// owning project's issues, so the server's view replaces the guess,
    /// and then yields the error through `PendingUpdate::wait`. The refetch
    /// is skipped when the board has since switched to another project.
    ///
    /// Must be called from within a tokio runtime.
    pub fn update_issue_status(&self, id: &str, status: IssueStatus) -> Result<PendingUpdate> {
        let (from, project_id, generation) = self.update(|inner| {
            let issue = inner
                .state
                .issues
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| ClientError::NotFound {
                    entity: "Issue",
                    id: id.to_string(),
                })?;
            let from = issue.status;
            issue.status = status;
            let project_id = issue.project_id.clone();
            let generation = inner.generations.entry(id.to_string()).or_insert(0);
            *generation += 1;
            Ok::<_, ClientError>((from, project_id, *generation))
        })?;

        tracing::debug!(issue_id = id, from = from.as_str(), to = status.as_str(), "Optimistic status change");
        self.emit(StoreEvent::IssueMoved {
            issue_id: id.to_string(),
            from,
            to: status,
        });

        let store = self.clone();
        let issue_id = id.to_string();
        let handle = tokio::spawn(async move {
            store
                .persist_status(issue_id, project_id, status, generation)
                .await
        });
        Ok(PendingUpdate {
            issue_id: id.to_string(),
            handle,
        })
    }

    async fn persist_status(
        &self,
        issue_id: String,
        project_id: String,
        status: IssueStatus,
        generation: u64,
    ) -> Result<Issue> {
        match self
            .api
            .update_issue(&issue_id, &IssuePatch::status(status))
            .await
        {
            Ok(server_issue) => {
                let merged = self.update(|inner| {
                    let latest = inner.generations.get(&issue_id).copied().unwrap_or(0);
                    if latest != generation {
                        return false;
                    }
                    match inner.state.issues.iter_mut().find(|i| i.id == issue_id) {
                        Some(slot) => {
                            *slot = server_issue.clone();
                            true
                        }
                        None => false,
                    }
                });
                if merged {
                    self.emit(StoreEvent::IssueUpdated {
                        issue_id: issue_id.clone(),
                    });
                } else {
                    tracing::debug!(
                        issue_id = %issue_id,
                        generation,
                        "Dropping superseded status reply"
                    );
                }
                Ok(server_issue)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    issue_id = %issue_id,
                    project_id = %project_id,
                    "Status update rejected"
                );
                let in_scope =
                    self.lock().state.issues_project_id.as_deref() == Some(project_id.as_str());
                if in_scope && self.load_issues(&project_id).await {
                    self.emit(StoreEvent::IssuesReconciled {
                        project_id: project_id.clone(),
                    });
                } else {
                    tracing::debug!(
                        project_id = %project_id,
                        "Issue list belongs to another project, skipping reconciliation"
                    );
                }
                Err(e)
            }
        }
    }

    /// Apply a finished board drag. Returns the pending persist call when
    /// the drop changed an issue's status, `None` when nothing changed.
    pub fn apply_drop(&self, drag: &DragResult) -> Result<Option<PendingUpdate>> {
        let plan = {
            let guard = self.lock();
            board::plan_drop(&guard.state.board(), drag)
        };
        match plan {
            DropPlan::Unchanged | DropPlan::Reorder => Ok(None),
            DropPlan::Move { issue_id, to } => self.update_issue_status(&issue_id, to).map(Some),
        }
    }

    pub async fn delete_issue(&self, id: &str) -> Result<()> {
        self.api.delete_issue(id).await?;
        self.update(|inner| {
            inner.state.issues.retain(|i| i.id != id);
            inner.generations.remove(id);
        });
        tracing::info!(issue_id = id, "Issue deleted");
        self.emit(StoreEvent::IssueDeleted {
            issue_id: id.to_string(),
        });
        Ok(())
    }

    // ── Members ───────────────────────────────────────────────────────

    pub async fn fetch_members(&self, organization_id: &str) {
        self.begin_load();
        let members = match self.api.list_members(organization_id).await {
            Ok(members) => members,
            Err(e) => {
                tracing::error!(error = %e, organization_id, "Failed to fetch members");
                Vec::new()
            }
        };
        let count = members.len();
        self.update(|inner| inner.state.members = members);
        self.emit(StoreEvent::MembersReplaced { count });
        self.end_load();
    }

    pub async fn update_member_role(
        &self,
        organization_id: &str,
        member_id: &str,
        role: OrgRole,
    ) -> Result<OrgMember> {
        let updated = self
            .api
            .update_member_role(organization_id, member_id, role)
            .await?;
        self.update(|inner| {
            if let Some(slot) = inner.state.members.iter_mut().find(|m| m.id == updated.id) {
                *slot = updated.clone();
            }
        });
        self.emit(StoreEvent::MemberUpdated {
            member_id: updated.id.clone(),
        });
        Ok(updated)
    }

    pub async fn remove_member(&self, organization_id: &str, member_id: &str) -> Result<()> {
        self.api.remove_member(organization_id, member_id).await?;
        self.update(|inner| inner.state.members.retain(|m| m.id != member_id));
        self.emit(StoreEvent::MemberRemoved {
            member_id: member_id.to_string(),
        });
        Ok(())
    }

    // ── Invites ───────────────────────────────────────────────────────

    pub async fn fetch_invites(&self, organization_id: &str) {
        self.begin_load();
        let invites = match self.api.list_invites(organization_id).await {
            Ok(invites) => invites,
            Err(e) => {
                tracing::error!(error = %e, organization_id, "Failed to fetch invites");
                Vec::new()
            }
        };
        let count = invites.len();
        self.update(|inner| inner.state.invites = invites);
        self.emit(StoreEvent::InvitesReplaced { count });
        self.end_load();
    }

    /// Send an invite. The address is checked locally, including against
    /// invites already pending, before any request is made.
    pub async fn invite_member(
        &self,
        organization_id: &str,
        email: &str,
        role: InviteRole,
    ) -> Result<Invite> {
        let pending: Vec<String> = self
            .lock()
            .state
            .invites
            .iter()
            .filter(|i| i.status == InviteStatus::Pending)
            .map(|i| i.email.clone())
            .collect();
        let new_invite = validation::invite(email, role, &pending)?;
        let created = self.api.create_invite(organization_id, &new_invite).await?;
        self.update(|inner| inner.state.invites.push(created.clone()));
        tracing::info!(invite_id = %created.id, role = created.role.as_str(), "Invite sent");
        self.emit(StoreEvent::InviteCreated {
            invite_id: created.id.clone(),
        });
        Ok(created)
    }

    /// Revoke an invite; the server's reply (status `revoked`) replaces the
    /// local record.
    pub async fn revoke_invite(&self, organization_id: &str, invite_id: &str) -> Result<Invite> {
        let revoked = self.api.revoke_invite(organization_id, invite_id).await?;
        self.update(|inner| {
            if let Some(slot) = inner.state.invites.iter_mut().find(|i| i.id == revoked.id) {
                *slot = revoked.clone();
            }
        });
        self.emit(StoreEvent::InviteRevoked {
            invite_id: revoked.id.clone(),
        });
        Ok(revoked)
    }
}
