//! GitHub integration: REST client, installation tracking and webhook
//! signature verification.

pub mod client;
pub mod service;
pub mod webhook;

pub use client::{GitHubApi, GitHubClient, RepoInfo};
pub use service::InstallationService;
pub use webhook::SignatureVerifier;
