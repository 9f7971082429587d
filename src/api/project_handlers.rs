//! Project API handlers

use crate::manifest::{AddonSpec, ApplicationSpec, ProjectManifest};
use crate::store::models::Project;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handlers::{AppError, PlatformState};
use crate::auth::AuthUser;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub github_repo: String,
}

#[derive(Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub github_repo: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Project> for ProjectResponse {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            github_repo: p.github_repo.clone(),
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectResponse>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List the caller's projects
pub async fn list_projects(
    State(state): State<PlatformState>,
    user: AuthUser,
) -> Result<Json<ProjectListResponse>, AppError> {
    let projects = state.deploys.list_projects(user.user_id).await?;
    let responses: Vec<ProjectResponse> = projects.iter().map(ProjectResponse::from).collect();
    let total = responses.len();
    Ok(Json(ProjectListResponse {
        projects: responses,
        total,
    }))
}

/// Create a project with an empty desired-state document
pub async fn create_project(
    State(state): State<PlatformState>,
    user: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    let project = state
        .deploys
        .create_project(user.user_id, &req.name, &req.github_repo)
        .await?;
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(&project))))
}

/// Get a project
pub async fn get_project(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = state.deploys.get_project(user.user_id, project_id).await?;
    Ok(Json(ProjectResponse::from(&project)))
}

/// Delete a project after telling the pipeline to tear it down
pub async fn delete_project(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.deploys.delete_project(user.user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the project's desired-state document
pub async fn get_project_config(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectManifest>, AppError> {
    let manifest = state
        .deploys
        .project_config(user.user_id, project_id)
        .await?;
    Ok(Json(manifest))
}

/// Declare (create or replace) an application in a project
pub async fn declare_application(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(spec): Json<ApplicationSpec>,
) -> Result<Json<ProjectManifest>, AppError> {
    if spec.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Application name is required".to_string(),
        ));
    }
    let manifest = state
        .deploys
        .declare_application(user.user_id, project_id, spec)
        .await?;
    Ok(Json(manifest))
}

/// Declare (create or replace) an addon in a project
pub async fn declare_addon(
    State(state): State<PlatformState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(spec): Json<AddonSpec>,
) -> Result<Json<ProjectManifest>, AppError> {
    if spec.name.trim().is_empty() {
        return Err(AppError::BadRequest("Addon name is required".to_string()));
    }
    let manifest = state
        .deploys
        .declare_addon(user.user_id, project_id, spec)
        .await?;
    Ok(Json(manifest))
}
