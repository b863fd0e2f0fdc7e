use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
    Guest,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }
}

impl FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "guest" => Ok(Self::Guest),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgMember {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}

/// Roles an invite may grant. Owners and guests are never invited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InviteRole {
    Admin,
    Member,
}

impl InviteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl FromStr for InviteRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            _ => Err(format!("Invalid invite role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            _ => Err(format!("Invalid invite status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub role: InviteRole,
    pub invited_by: String,
    pub token: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub key: String,
    pub description: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// Board column an issue sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Todo,
    InProgress,
    Done,
}

impl IssueStatus {
    /// Columns in board order.
    pub const ALL: [IssueStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(Self::Todo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Story,
    Bug,
    Task,
    Epic,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "STORY",
            Self::Bug => "BUG",
            Self::Task => "TASK",
            Self::Epic => "EPIC",
        }
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STORY" => Ok(Self::Story),
            "BUG" => Ok(Self::Bug),
            "TASK" => Ok(Self::Task),
            "EPIC" => Ok(Self::Epic),
            _ => Err(format!("Invalid issue type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub assignee_id: Option<String>,
    pub reporter_id: String,
    pub project_id: String,
    pub sprint_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Partial payloads sent by create/update actions.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Priority,
    pub issue_type: IssueType,
    pub assignee_id: Option<String>,
}

impl NewIssue {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: IssueStatus::Todo,
            priority: Priority::Medium,
            issue_type: IssueType::Task,
            assignee_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub issue_type: Option<IssueType>,
    pub assignee_id: Option<String>,
    pub sprint_id: Option<String>,
}

impl IssuePatch {
    pub fn status(status: IssueStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInvite {
    pub email: String,
    pub role: InviteRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_status_roundtrips_through_str() {
        for status in IssueStatus::ALL {
            assert_eq!(IssueStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(IssueStatus::from_str("in_progress").is_err());
    }

    #[test]
    fn issue_status_titles_match_board_headers() {
        assert_eq!(IssueStatus::Todo.title(), "To Do");
        assert_eq!(IssueStatus::InProgress.title(), "In Progress");
        assert_eq!(IssueStatus::Done.title(), "Done");
    }

    #[test]
    fn priority_rejects_wire_prefixed_form() {
        assert_eq!(Priority::from_str("URGENT"), Ok(Priority::Urgent));
        assert!(Priority::from_str("ISSUE_PRIORITY_URGENT").is_err());
    }

    #[test]
    fn org_role_parse_is_lowercase_only() {
        assert_eq!(OrgRole::from_str("guest"), Ok(OrgRole::Guest));
        assert!(OrgRole::from_str("Owner").is_err());
    }

    #[test]
    fn invite_role_excludes_owner() {
        assert!(InviteRole::from_str("owner").is_err());
        assert_eq!(InviteRole::from_str("admin"), Ok(InviteRole::Admin));
    }

    #[test]
    fn issue_serializes_type_field_name() {
        let issue = Issue {
            id: "1".into(),
            key: "NEX-1".into(),
            title: "Implement Frontend".into(),
            description: String::new(),
            status: IssueStatus::InProgress,
            priority: Priority::High,
            issue_type: IssueType::Story,
            assignee_id: None,
            reporter_id: "u1".into(),
            project_id: "p1".into(),
            sprint_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "STORY");
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["reporterId"], "u1");
    }

    #[test]
    fn new_issue_defaults() {
        let issue = NewIssue::titled("Design Database");
        assert_eq!(issue.status, IssueStatus::Todo);
        assert_eq!(issue.priority, Priority::Medium);
        assert_eq!(issue.issue_type, IssueType::Task);
    }
}
