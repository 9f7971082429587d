//! PlatformStore trait definition
//!
//! Abstract interface over the relational store. Mirrors every operation
//! the Postgres client exposes, enabling testing with an in-memory mock.

use crate::store::models::{AccountIdentity, Installation, Project, User};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PlatformStore: Send + Sync {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Create a new user. Fails if the email is already taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by id.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Get a user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update a user's mutable profile fields (name, password hash).
    async fn update_user(&self, user: &User) -> Result<()>;

    // ========================================================================
    // Project operations
    // ========================================================================

    /// Create a new project row, including its initial manifest document.
    async fn create_project(&self, project: &Project) -> Result<()>;

    /// Get a project by id.
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    /// Get a project by owner and name (names are unique per owner).
    async fn get_project_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Project>>;

    /// List all projects owned by a user, newest first.
    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>>;

    /// Replace a project's manifest document. The write is atomic from the
    /// caller's perspective: later readers see either the old or the new
    /// document, never a partial one.
    async fn update_project_manifest(&self, id: Uuid, manifest_yaml: &str) -> Result<()>;

    /// Delete a project row.
    async fn delete_project(&self, id: Uuid) -> Result<()>;

    // ========================================================================
    // Installation operations
    // ========================================================================

    /// Insert or update an installation, keyed by the provider's
    /// installation id.
    async fn upsert_installation(&self, installation: &Installation) -> Result<()>;

    /// Get an installation by provider installation id.
    async fn get_installation(&self, installation_id: i64) -> Result<Option<Installation>>;

    /// Delete an installation and cascade its user links.
    async fn delete_installation(&self, installation_id: i64) -> Result<()>;

    /// List the installations linked to a user.
    async fn list_installations_for_user(&self, user_id: Uuid) -> Result<Vec<Installation>>;

    /// Link a user to an installation. Idempotent.
    async fn link_user_to_installation(&self, user_id: Uuid, installation_id: i64) -> Result<()>;

    /// Whether the user/installation pair is already linked.
    async fn is_user_linked(&self, user_id: Uuid, installation_id: i64) -> Result<bool>;

    /// Update only the account identity columns of an installation.
    async fn update_installation_account(
        &self,
        installation_id: i64,
        account: &AccountIdentity,
    ) -> Result<()>;
}
