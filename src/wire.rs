//! Wire representations for the REST API.
//!
//! Responses wrap entities in a named envelope (`{"projects": [...]}`,
//! `{"project": {...}}`). Issue priority and type travel in a prefixed form
//! (`ISSUE_PRIORITY_HIGH`, `ISSUE_TYPE_BUG`) and are translated to the bare
//! domain enums here. Everything else maps field-for-field.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, Result};
use crate::models::*;

const PRIORITY_PREFIX: &str = "ISSUE_PRIORITY_";
const TYPE_PREFIX: &str = "ISSUE_TYPE_";

pub fn priority_to_wire(priority: Priority) -> String {
    format!("{}{}", PRIORITY_PREFIX, priority.as_str())
}

/// Accepts the prefixed form plus the server's five-level extremes
/// (`LOWEST` folds into `LOW`, `HIGHEST` into `URGENT`).
pub fn priority_from_wire(value: &str) -> Result<Priority> {
    let bare = value.strip_prefix(PRIORITY_PREFIX).unwrap_or(value);
    match bare {
        "LOWEST" | "LOW" => Ok(Priority::Low),
        "MEDIUM" => Ok(Priority::Medium),
        "HIGH" => Ok(Priority::High),
        "HIGHEST" | "URGENT" => Ok(Priority::Urgent),
        _ => Err(ClientError::UnknownEnum {
            kind: "priority",
            value: value.to_string(),
        }),
    }
}

pub fn issue_type_to_wire(issue_type: IssueType) -> String {
    format!("{}{}", TYPE_PREFIX, issue_type.as_str())
}

pub fn issue_type_from_wire(value: &str) -> Result<IssueType> {
    let bare = value.strip_prefix(TYPE_PREFIX).unwrap_or(value);
    match bare {
        "STORY" => Ok(IssueType::Story),
        "BUG" => Ok(IssueType::Bug),
        "TASK" | "SUB_TASK" => Ok(IssueType::Task),
        "EPIC" => Ok(IssueType::Epic),
        _ => Err(ClientError::UnknownEnum {
            kind: "issue type",
            value: value.to_string(),
        }),
    }
}

/// Pull `key` out of a response envelope and decode it.
pub fn unwrap_envelope<T: DeserializeOwned>(
    mut body: serde_json::Value,
    key: &str,
    url: &str,
) -> Result<T> {
    let inner = body
        .get_mut(key)
        .map(serde_json::Value::take)
        .ok_or_else(|| ClientError::Decode {
            url: url.to_string(),
            message: format!("missing '{}' field in response", key),
        })?;
    serde_json::from_value(inner).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Error body returned by the gateway on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIssue {
    pub id: String,
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: IssueStatus,
    pub priority: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub assignee_id: Option<String>,
    pub reporter_id: String,
    pub project_id: String,
    pub sprint_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WireIssue {
    pub fn into_issue(self) -> Result<Issue> {
        Ok(Issue {
            priority: priority_from_wire(&self.priority)?,
            issue_type: issue_type_from_wire(&self.issue_type)?,
            id: self.id,
            key: self.key,
            title: self.title,
            description: self.description,
            status: self.status,
            assignee_id: self.assignee_id,
            reporter_id: self.reporter_id,
            project_id: self.project_id,
            sprint_id: self.sprint_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&Issue> for WireIssue {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            key: issue.key.clone(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: issue.status,
            priority: priority_to_wire(issue.priority),
            issue_type: issue_type_to_wire(issue.issue_type),
            assignee_id: issue.assignee_id.clone(),
            reporter_id: issue.reporter_id.clone(),
            project_id: issue.project_id.clone(),
            sprint_id: issue.sprint_id.clone(),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

pub fn issues_from_wire(wire: Vec<WireIssue>) -> Result<Vec<Issue>> {
    wire.into_iter().map(WireIssue::into_issue).collect()
}

// ── Request payloads ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<&'a str>,
}

impl<'a> From<&'a NewProject> for CreateProjectRequest<'a> {
    fn from(p: &'a NewProject) -> Self {
        Self {
            name: &p.name,
            key: &p.key,
            description: p.description.as_deref(),
            organization_id: p.organization_id.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

impl<'a> From<&'a ProjectPatch> for UpdateProjectRequest<'a> {
    fn from(p: &'a ProjectPatch) -> Self {
        Self {
            name: p.name.as_deref(),
            key: p.key.as_deref(),
            description: p.description.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub status: IssueStatus,
    pub priority: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<&'a str>,
}

impl<'a> From<&'a NewIssue> for CreateIssueRequest<'a> {
    fn from(i: &'a NewIssue) -> Self {
        Self {
            title: &i.title,
            description: &i.description,
            status: i.status,
            priority: priority_to_wire(i.priority),
            issue_type: issue_type_to_wire(i.issue_type),
            assignee_id: i.assignee_id.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<&'a str>,
}

impl<'a> From<&'a IssuePatch> for UpdateIssueRequest<'a> {
    fn from(p: &'a IssuePatch) -> Self {
        Self {
            title: p.title.as_deref(),
            description: p.description.as_deref(),
            status: p.status,
            priority: p.priority.map(priority_to_wire),
            issue_type: p.issue_type.map(issue_type_to_wire),
            assignee_id: p.assignee_id.as_deref(),
            sprint_id: p.sprint_id.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateInviteRequest<'a> {
    pub email: &'a str,
    pub role: InviteRole,
}

#[derive(Debug, Serialize)]
pub struct UpdateMemberRoleRequest {
    pub role: OrgRole,
}
