//! GitHub API handlers — webhook intake, installations, repositories.

use crate::github::client::RepoInfo;
use crate::store::models::Installation;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use super::handlers::{AppError, PlatformState};
use crate::auth::AuthUser;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Serialize)]
pub struct InstallationResponse {
    pub installation_id: i64,
    pub account_login: Option<String>,
    pub account_type: String,
}

impl From<&Installation> for InstallationResponse {
    fn from(i: &Installation) -> Self {
        Self {
            installation_id: i.installation_id,
            account_login: i.account.login().map(String::from),
            account_type: i.account_type.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct InstallationListResponse {
    pub installations: Vec<InstallationResponse>,
}

#[derive(Serialize)]
pub struct RepositoryListResponse {
    pub repositories: Vec<RepoInfo>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /github/webhook — public, authenticated by HMAC signature.
///
/// The raw body is needed for signature verification, so this handler
/// takes `Bytes` instead of a typed JSON extractor.
pub async fn webhook(
    State(state): State<PlatformState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature".to_string()))?;

    state.installations.handle_webhook(&body, signature).await?;
    Ok(StatusCode::OK)
}

/// GET /github/installations — installations linked to the caller
pub async fn list_installations(
    State(state): State<PlatformState>,
    user: AuthUser,
) -> Result<Json<InstallationListResponse>, AppError> {
    let installations = state
        .installations
        .list_user_installations(user.user_id)
        .await?;
    Ok(Json(InstallationListResponse {
        installations: installations.iter().map(InstallationResponse::from).collect(),
    }))
}

/// POST /github/installations/{installation_id}/link — attach an
/// installation to the caller
pub async fn link_installation(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(installation_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state
        .installations
        .link_user_to_installation(user.user_id, installation_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /github/installations/{installation_id}/repositories —
/// writable repositories visible through a linked installation
pub async fn list_repositories(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(installation_id): Path<i64>,
) -> Result<Json<RepositoryListResponse>, AppError> {
    let repositories = state
        .installations
        .get_repositories(user.user_id, installation_id)
        .await?;
    Ok(Json(RepositoryListResponse { repositories }))
}
