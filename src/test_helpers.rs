//! Test helper factories and mock state builders
//!
//! Provides convenience functions for creating test objects with sensible
//! defaults, and helpers for building mock ServerState instances.
#![allow(dead_code)]

use crate::api::handlers::{PlatformState, ServerState};
use crate::deploy::dispatch::recording::RecordingEmitter;
use crate::deploy::DeployService;
use crate::github::client::{GitHubApi, RepoInfo};
use crate::github::{InstallationService, SignatureVerifier};
use crate::store::mock::MockPlatformStore;
use crate::store::models::User;
use crate::AuthConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-key-minimum-32-chars!!";
pub const TEST_WEBHOOK_SECRET: &str = "webhook-test-secret";

/// GitHubApi stub returning a fixed repository listing.
pub struct FixedGitHub {
    pub repos: Vec<RepoInfo>,
}

#[async_trait]
impl GitHubApi for FixedGitHub {
    async fn repository_dispatch(
        &self,
        _owner: &str,
        _repo: &str,
        _event_type: &str,
        _client_payload: serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<RepoInfo>> {
        Ok(self.repos.clone())
    }
}

// ============================================================================
// Mock state builders
// ============================================================================

/// Everything a router test needs a handle on.
pub struct TestHarness {
    pub state: PlatformState,
    pub store: Arc<MockPlatformStore>,
    pub emitter: Arc<RecordingEmitter>,
}

/// Build a full ServerState over in-memory backends.
pub fn test_harness(auth_config: Option<AuthConfig>) -> TestHarness {
    let store = Arc::new(MockPlatformStore::default());
    let emitter = Arc::new(RecordingEmitter::default());
    let github: Arc<dyn GitHubApi> = Arc::new(FixedGitHub { repos: Vec::new() });

    let deploys = DeployService::new(
        store.clone(),
        emitter.clone(),
        "acme".to_string(),
        "pipeline".to_string(),
    );
    let installations = InstallationService::new(
        store.clone(),
        github,
        SignatureVerifier::new(Some(TEST_WEBHOOK_SECRET.to_string())),
    );

    let state = Arc::new(ServerState {
        store: store.clone(),
        deploys,
        installations,
        auth_config,
    });

    TestHarness {
        state,
        store,
        emitter,
    }
}

/// Build just the shared state, for tests that never inspect the backends.
pub fn test_state(auth_config: Option<AuthConfig>) -> PlatformState {
    test_harness(auth_config).state
}

/// Create a test AuthConfig suitable for integration tests.
///
/// Uses a fixed JWT secret. Tests that use `create_router()` should pass
/// `Some(test_auth_config())` as `auth_config` to avoid deny-by-default
/// 403 rejections.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiry_secs: 3600,
        allow_registration: true,
    }
}

/// Generate a valid Bearer token string for a given user id.
///
/// Returns the full header value: `"Bearer eyJ..."`.
/// Uses the same secret as `test_auth_config()`.
pub fn test_bearer_token(user_id: Uuid) -> String {
    let token = crate::auth::jwt::encode_jwt(
        user_id,
        "test@example.com",
        "Test User",
        TEST_SECRET,
        3600,
    )
    .expect("test token encoding should succeed");
    format!("Bearer {}", token)
}

// ============================================================================
// Test data factories
// ============================================================================

/// Create a test user with a throwaway bcrypt hash.
pub fn test_user() -> User {
    let now = chrono::Utc::now();
    User {
        id: Uuid::new_v4(),
        email: "test@example.com".to_string(),
        name: "Test User".to_string(),
        // bcrypt of "password123" at low cost, fine for tests
        password_hash: bcrypt::hash("password123", 4).expect("bcrypt"),
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Router-level tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::github::webhook::sign;
    use crate::store::PlatformStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = create_router(test_state(None));
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = create_router(test_state(Some(test_auth_config())));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/projects")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let app = create_router(test_state(Some(test_auth_config())));

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/register",
                None,
                serde_json::json!({
                    "email": "Alice@Example.com",
                    "name": "Alice",
                    "password": "hunter2hunter2"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["token"].is_string());
        // Email is normalized to lowercase
        assert_eq!(body["user"]["email"], "alice@example.com");

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                serde_json::json!({
                    "email": "alice@example.com",
                    "password": "hunter2hunter2"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_profile_changes_name_and_password() {
        let harness = test_harness(Some(test_auth_config()));
        let app = create_router(harness.state.clone());

        let user = test_user();
        harness.store.create_user(&user).await.unwrap();
        let token = test_bearer_token(user.id);

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/v1/users/me",
                Some(&token),
                serde_json::json!({"name": "Renamed", "password": "fresh-password-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["name"], "Renamed");

        // The new password works, the old one no longer does.
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                serde_json::json!({"email": user.email, "password": "fresh-password-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                serde_json::json!({"email": user.email, "password": "password123"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_profile_rejects_short_password() {
        let harness = test_harness(Some(test_auth_config()));
        let app = create_router(harness.state.clone());

        let user = test_user();
        harness.store.create_user(&user).await.unwrap();
        let token = test_bearer_token(user.id);

        let resp = app
            .oneshot(json_request(
                "PUT",
                "/api/v1/users/me",
                Some(&token),
                serde_json::json!({"password": "short"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_failure_is_generic() {
        let app = create_router(test_state(Some(test_auth_config())));
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                serde_json::json!({"email": "ghost@example.com", "password": "whatever1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_declare_addon_end_to_end() {
        let harness = test_harness(Some(test_auth_config()));
        let app = create_router(harness.state.clone());

        let user = test_user();
        harness.store.create_user(&user).await.unwrap();
        let token = test_bearer_token(user.id);

        // Create a project
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/projects",
                Some(&token),
                serde_json::json!({"name": "demo", "github_repo": "acme/demo"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let project = body_json(resp).await;
        let project_id = project["id"].as_str().unwrap().to_string();

        // Declare an addon
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/projects/{project_id}/addons"),
                Some(&token),
                serde_json::json!({
                    "name": "cache",
                    "type": "redis",
                    "tier": "small",
                    "storage": "1Gi"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let manifest = body_json(resp).await;
        assert_eq!(manifest["addons"][0]["name"], "cache");
        assert_eq!(manifest["addons"][0]["type"], "redis");

        // The pipeline was told about it
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        let dispatched = harness.emitter.take();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].2.path, "projects/demo/addons/cache");
        assert_eq!(
            dispatched[0].2.action,
            crate::deploy::DispatchAction::Apply
        );

        // And the config endpoint reflects it
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/projects/{project_id}/config"))
                    .header("authorization", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let config = body_json(resp).await;
        assert_eq!(config["applications"].as_array().unwrap().len(), 0);
        assert_eq!(config["addons"][0]["storage"], "1Gi");
    }

    #[tokio::test]
    async fn test_webhook_missing_signature_is_bad_request() {
        let app = create_router(test_state(None));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/github/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"created"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Missing signature");
    }

    #[tokio::test]
    async fn test_webhook_signed_delivery_registers_installation() {
        let harness = test_harness(None);
        let app = create_router(harness.state.clone());

        let payload = serde_json::json!({
            "action": "created",
            "installation": {
                "id": 42,
                "account": {"login": "acme", "type": "Organization"}
            }
        })
        .to_string();
        let signature = sign(payload.as_bytes(), TEST_WEBHOOK_SECRET);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/github/webhook")
                    .header("content-type", "application/json")
                    .header("x-hub-signature-256", signature)
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(harness.store.get_installation(42).await.unwrap().is_some());
    }
}
