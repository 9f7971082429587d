//! GitHub REST API client.
//!
//! Two calls matter to the platform: the repository-dispatch event that
//! triggers the delivery pipeline, and the repository listing the
//! installation resolver tallies owner logins from.

use crate::deploy::dispatch::{DispatchEmitter, DispatchPayload};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::GitHubSettings;

/// Event type tag carried by every dispatch to the pipeline repository.
pub const DISPATCH_EVENT_TYPE: &str = "config-api";

const REPOS_PER_PAGE: usize = 100;

/// Abstract interface over the GitHub REST API, enabling wiremock-backed
/// and hand-rolled test doubles.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fire a `repository_dispatch` event at `owner/repo`.
    async fn repository_dispatch(
        &self,
        owner: &str,
        repo: &str,
        event_type: &str,
        client_payload: serde_json::Value,
    ) -> Result<()>;

    /// List every repository visible to the configured credential,
    /// following pagination until exhausted. Page order is preserved.
    async fn list_repositories(&self) -> Result<Vec<RepoInfo>>;
}

/// A repository as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub permissions: RepoPermissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoPermissions {
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub admin: bool,
}

impl RepoInfo {
    /// Whether the credential can write to this repository.
    pub fn writable(&self) -> bool {
        self.permissions.push || self.permissions.admin
    }
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    event_type: &'a str,
    client_payload: serde_json::Value,
}

/// Concrete client over reqwest.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder
            .header("accept", "application/vnd.github+json")
            .header("user-agent", "deployment-platform");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn repository_dispatch(
        &self,
        owner: &str,
        repo: &str,
        event_type: &str,
        client_payload: serde_json::Value,
    ) -> Result<()> {
        let url = format!("{}/repos/{}/{}/dispatches", self.api_url, owner, repo);
        let response = self
            .request(self.http.post(&url))
            .json(&DispatchRequest {
                event_type,
                client_payload,
            })
            .send()
            .await
            .context("Failed to send repository dispatch")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            bail!("Repository dispatch failed ({}): {}", status, body);
        }
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<RepoInfo>> {
        let mut repos = Vec::new();
        let mut page = 1usize;
        loop {
            let url = format!(
                "{}/user/repos?per_page={}&page={}",
                self.api_url, REPOS_PER_PAGE, page
            );
            let response = self
                .request(self.http.get(&url))
                .send()
                .await
                .context("Failed to list repositories")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "no body".to_string());
                bail!("Repository listing failed ({}): {}", status, body);
            }

            let batch: Vec<RepoInfo> = response
                .json()
                .await
                .context("Failed to parse repository listing")?;
            let exhausted = batch.len() < REPOS_PER_PAGE;
            repos.extend(batch);
            if exhausted {
                break;
            }
            page += 1;
        }
        Ok(repos)
    }
}

#[async_trait]
impl DispatchEmitter for GitHubClient {
    async fn dispatch(&self, owner: &str, repo: &str, payload: DispatchPayload) -> Result<()> {
        let client_payload =
            serde_json::to_value(&payload).context("Failed to serialize dispatch payload")?;
        self.repository_dispatch(owner, repo, DISPATCH_EVENT_TYPE, client_payload)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::dispatch::DispatchAction;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&GitHubSettings {
            token: Some("test-token".to_string()),
            webhook_secret: None,
            api_url: server.uri(),
            dispatch_owner: "acme".to_string(),
            dispatch_repo: "pipeline".to_string(),
        })
    }

    fn repo_json(id: i64, owner: &str, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": name,
            "full_name": format!("{owner}/{name}"),
            "owner": {"login": owner},
            "private": false,
            "permissions": {"push": true, "admin": false}
        })
    }

    #[tokio::test]
    async fn test_repository_dispatch_sends_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/pipeline/dispatches"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "event_type": "config-api",
                "client_payload": {
                    "path": "projects/demo/addons/cache",
                    "action": "apply"
                }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let payload = DispatchPayload {
            path: "projects/demo/addons/cache".to_string(),
            action: DispatchAction::Apply,
            spec: Some(serde_json::json!({"type": "redis"})),
        };
        client.dispatch("acme", "pipeline", payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/pipeline/dispatches"))
            .respond_with(ResponseTemplate::new(422).set_body_string("no such repo"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let payload = DispatchPayload {
            path: "projects/demo".to_string(),
            action: DispatchAction::Remove,
            spec: None,
        };
        let err = client
            .dispatch("acme", "pipeline", payload)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("422"));
    }

    #[tokio::test]
    async fn test_list_repositories_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                repo_json(1, "acme", "api"),
                repo_json(2, "acme", "web"),
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let repos = client.list_repositories().await.unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].owner.login, "acme");
        assert!(repos[0].writable());
    }

    #[tokio::test]
    async fn test_list_repositories_follows_pagination() {
        let server = MockServer::start().await;

        let full_page: Vec<serde_json::Value> = (0..100)
            .map(|i| repo_json(i, "acme", &format!("repo-{i}")))
            .collect();
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&full_page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([repo_json(100, "beta", "tail")])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let repos = client.list_repositories().await.unwrap();
        assert_eq!(repos.len(), 101);
        assert_eq!(repos[100].owner.login, "beta");
    }

    #[tokio::test]
    async fn test_list_repositories_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.list_repositories().await.is_err());
    }
}
