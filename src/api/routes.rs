//! API route definitions

use super::auth_handlers;
use super::github_handlers;
use super::handlers::{self, PlatformState};
use super::project_handlers;
use crate::auth::middleware::require_auth;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: PlatformState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Everything behind Bearer auth
    let protected = Router::new()
        // ====================================================================
        // Auth (user info)
        // ====================================================================
        .route("/api/v1/auth/me", get(auth_handlers::me))
        .route("/api/v1/users/me", put(auth_handlers::update_me))
        // ====================================================================
        // Projects
        // ====================================================================
        .route(
            "/api/v1/projects",
            get(project_handlers::list_projects).post(project_handlers::create_project),
        )
        .route(
            "/api/v1/projects/{project_id}",
            get(project_handlers::get_project).delete(project_handlers::delete_project),
        )
        .route(
            "/api/v1/projects/{project_id}/config",
            get(project_handlers::get_project_config),
        )
        .route(
            "/api/v1/projects/{project_id}/applications",
            post(project_handlers::declare_application),
        )
        .route(
            "/api/v1/projects/{project_id}/addons",
            post(project_handlers::declare_addon),
        )
        // ====================================================================
        // GitHub installations
        // ====================================================================
        .route(
            "/api/v1/github/installations",
            get(github_handlers::list_installations),
        )
        .route(
            "/api/v1/github/installations/{installation_id}/link",
            post(github_handlers::link_installation),
        )
        .route(
            "/api/v1/github/installations/{installation_id}/repositories",
            get(github_handlers::list_repositories),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    // Public surface: health, login/registration, signed webhooks
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/auth/register", post(auth_handlers::register))
        .route("/api/v1/auth/login", post(auth_handlers::login))
        .route("/api/v1/auth/refresh", post(auth_handlers::refresh))
        .route("/api/v1/github/webhook", post(github_handlers::webhook))
        .merge(protected)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
