//! Typed client for the NexusFlow REST API.
//!
//! `Api` is the seam the store talks to; `HttpApi` is the reqwest-backed
//! implementation. Tests substitute scripted implementations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::errors::{ClientError, Result};
use crate::models::*;
use crate::wire::{self, ErrorBody, WireIssue};

#[async_trait]
pub trait Api: Send + Sync {
    async fn list_organizations(&self) -> Result<Vec<Organization>>;
    async fn create_organization(&self, org: &NewOrganization) -> Result<Organization>;

    async fn list_projects(&self, organization_id: Option<&str>) -> Result<Vec<Project>>;
    async fn create_project(&self, project: &NewProject) -> Result<Project>;
    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Project>;
    async fn delete_project(&self, id: &str) -> Result<()>;

    async fn list_issues(&self, project_id: &str) -> Result<Vec<Issue>>;
    async fn create_issue(&self, project_id: &str, issue: &NewIssue) -> Result<Issue>;
    async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<Issue>;
    async fn delete_issue(&self, id: &str) -> Result<()>;

    async fn list_members(&self, organization_id: &str) -> Result<Vec<OrgMember>>;
    async fn update_member_role(
        &self,
        organization_id: &str,
        member_id: &str,
        role: OrgRole,
    ) -> Result<OrgMember>;
    async fn remove_member(&self, organization_id: &str, member_id: &str) -> Result<()>;

    async fn list_invites(&self, organization_id: &str) -> Result<Vec<Invite>>;
    async fn create_invite(&self, organization_id: &str, invite: &NewInvite) -> Result<Invite>;
    async fn revoke_invite(&self, organization_id: &str, invite_id: &str) -> Result<Invite>;
}

/// reqwest-backed `Api`.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("nexusflow-client");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("Invalid API URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client,
            base,
            token,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.api_url, config.token.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Base URL extended by `segments`, each percent-encoded as one path
    /// segment.
    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        // Only cannot-be-a-base URLs refuse segments; http(s) never does.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%method, url, request_id = %request_id, "api request");
        let mut req = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("X-Request-Id", request_id);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let resp = req.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| status_text(status));
        tracing::debug!(url, status = status.as_u16(), %message, "api request rejected");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
        key: &str,
        url: &str,
    ) -> Result<T> {
        let body = resp
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ClientError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        wire::unwrap_envelope(body, key, url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str], key: &str) -> Result<T> {
        let url = self.url(path);
        let resp = self.send(self.request(Method::GET, &url), &url).await?;
        self.read_envelope(resp, key, &url).await
    }

    async fn with_body<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        body: &B,
        key: &str,
    ) -> Result<T> {
        let url = self.url(path);
        let resp = self
            .send(self.request(method, &url).json(body), &url)
            .await?;
        self.read_envelope(resp, key, &url).await
    }

    async fn delete(&self, path: &[&str]) -> Result<()> {
        let url = self.url(path);
        self.send(self.request(Method::DELETE, &url), &url).await?;
        Ok(())
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[async_trait]
impl Api for HttpApi {
    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.get(&["organizations"], "organizations").await
    }

    async fn create_organization(&self, org: &NewOrganization) -> Result<Organization> {
        let body = wire::CreateOrganizationRequest {
            name: &org.name,
            slug: &org.slug,
            description: org.description.as_deref(),
        };
        self.with_body(Method::POST, &["organizations"], &body, "organization")
            .await
    }

    async fn list_projects(&self, organization_id: Option<&str>) -> Result<Vec<Project>> {
        let url = self.url(&["projects"]);
        let mut req = self.request(Method::GET, &url);
        if let Some(org) = organization_id {
            req = req.query(&[("organizationId", org)]);
        }
        let resp = self.send(req, &url).await?;
        self.read_envelope(resp, "projects", &url).await
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let body = wire::CreateProjectRequest::from(project);
        self.with_body(Method::POST, &["projects"], &body, "project")
            .await
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Project> {
        let body = wire::UpdateProjectRequest::from(patch);
        self.with_body(Method::PATCH, &["projects", id], &body, "project")
            .await
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.delete(&["projects", id]).await
    }

    async fn list_issues(&self, project_id: &str) -> Result<Vec<Issue>> {
        let wire: Vec<WireIssue> = self
            .get(&["projects", project_id, "issues"], "issues")
            .await?;
        wire::issues_from_wire(wire)
    }

    async fn create_issue(&self, project_id: &str, issue: &NewIssue) -> Result<Issue> {
        let body = wire::CreateIssueRequest::from(issue);
        let wire: WireIssue = self
            .with_body(
                Method::POST,
                &["projects", project_id, "issues"],
                &body,
                "issue",
            )
            .await?;
        wire.into_issue()
    }

    async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<Issue> {
        let body = wire::UpdateIssueRequest::from(patch);
        let wire: WireIssue = self
            .with_body(Method::PATCH, &["issues", id], &body, "issue")
            .await?;
        wire.into_issue()
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        self.delete(&["issues", id]).await
    }

    async fn list_members(&self, organization_id: &str) -> Result<Vec<OrgMember>> {
        self.get(
            &["organizations", organization_id, "members"],
            "members",
        )
        .await
    }

    async fn update_member_role(
        &self,
        organization_id: &str,
        member_id: &str,
        role: OrgRole,
    ) -> Result<OrgMember> {
        let body = wire::UpdateMemberRoleRequest { role };
        self.with_body(
            Method::PATCH,
            &["organizations", organization_id, "members", member_id],
            &body,
            "member",
        )
        .await
    }

    async fn remove_member(&self, organization_id: &str, member_id: &str) -> Result<()> {
        self.delete(&["organizations", organization_id, "members", member_id])
            .await
    }

    async fn list_invites(&self, organization_id: &str) -> Result<Vec<Invite>> {
        self.get(
            &["organizations", organization_id, "invites"],
            "invites",
        )
        .await
    }

    async fn create_invite(&self, organization_id: &str, invite: &NewInvite) -> Result<Invite> {
        let body = wire::CreateInviteRequest {
            email: &invite.email,
            role: invite.role,
        };
        self.with_body(
            Method::POST,
            &["organizations", organization_id, "invites"],
            &body,
            "invite",
        )
        .await
    }

    async fn revoke_invite(&self, organization_id: &str, invite_id: &str) -> Result<Invite> {
        self.with_body(
            Method::POST,
            &["organizations", organization_id, "invites", invite_id, "revoke"],
            &serde_json::json!({}),
            "invite",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpApi::new("http://localhost:8080/api/v1/", None, None).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080/api/v1");
        assert_eq!(api.url(&["projects"]), "http://localhost:8080/api/v1/projects");
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let api = HttpApi::new("http://localhost:8080/api/v1", None, None).unwrap();
        assert_eq!(
            api.url(&["projects", "a/b?c#d", "issues"]),
            "http://localhost:8080/api/v1/projects/a%2Fb%3Fc%23d/issues"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = HttpApi::new("not a url", None, None).err().unwrap();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn status_text_uses_canonical_reason() {
        assert_eq!(status_text(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(
            status_text(StatusCode::from_u16(599).unwrap()),
            "HTTP 599"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Port 9 (discard) is closed on loopback in test environments.
        let api = HttpApi::new(
            "http://127.0.0.1:9",
            None,
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let err = api.list_projects(None).await.unwrap_err();
        match err {
            ClientError::Transport { url, .. } => {
                assert_eq!(url, "http://127.0.0.1:9/projects")
            }
            other => panic!("Expected Transport, got {:?}", other),
        }
    }
}
