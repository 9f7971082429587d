//! HTTP API for the deployment platform

pub mod auth_handlers;
pub mod github_handlers;
pub mod handlers;
pub mod project_handlers;
pub mod routes;

pub use handlers::{AppError, PlatformState, ServerState};
pub use routes::create_router;
