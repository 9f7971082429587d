//! In-memory mock implementation of PlatformStore for testing.
//!
//! Backed by `tokio::sync::RwLock<HashMap<K, V>>` collections.
//! Conditionally compiled with `#[cfg(test)]`.

use crate::store::models::{AccountIdentity, Installation, Project, User};
use crate::store::traits::PlatformStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory mock implementation of PlatformStore for testing.
#[derive(Default)]
pub struct MockPlatformStore {
    pub users: RwLock<HashMap<Uuid, User>>,
    pub projects: RwLock<HashMap<Uuid, Project>>,
    pub installations: RwLock<HashMap<i64, Installation>>,
    pub user_installations: RwLock<HashSet<(Uuid, i64)>>,
    /// When set, account-identity updates fail. Used to exercise the
    /// swallowed-failure path of the resolver's background correction.
    pub fail_account_updates: AtomicBool,
}

impl MockPlatformStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlatformStore for MockPlatformStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            bail!("duplicate email");
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn create_project(&self, project: &Project) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn get_project_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .find(|p| p.owner_id == owner_id && p.name == name)
            .cloned())
    }

    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn update_project_manifest(&self, id: Uuid, manifest_yaml: &str) -> Result<()> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("project not found"))?;
        project.manifest_yaml = manifest_yaml.to_string();
        project.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        self.projects.write().await.remove(&id);
        Ok(())
    }

    async fn upsert_installation(&self, installation: &Installation) -> Result<()> {
        self.installations
            .write()
            .await
            .insert(installation.installation_id, installation.clone());
        Ok(())
    }

    async fn get_installation(&self, installation_id: i64) -> Result<Option<Installation>> {
        Ok(self
            .installations
            .read()
            .await
            .get(&installation_id)
            .cloned())
    }

    async fn delete_installation(&self, installation_id: i64) -> Result<()> {
        self.installations.write().await.remove(&installation_id);
        self.user_installations
            .write()
            .await
            .retain(|(_, id)| *id != installation_id);
        Ok(())
    }

    async fn list_installations_for_user(&self, user_id: Uuid) -> Result<Vec<Installation>> {
        let links = self.user_installations.read().await;
        let installations = self.installations.read().await;
        let mut result: Vec<Installation> = links
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, iid)| installations.get(iid).cloned())
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn link_user_to_installation(&self, user_id: Uuid, installation_id: i64) -> Result<()> {
        self.user_installations
            .write()
            .await
            .insert((user_id, installation_id));
        Ok(())
    }

    async fn is_user_linked(&self, user_id: Uuid, installation_id: i64) -> Result<bool> {
        Ok(self
            .user_installations
            .read()
            .await
            .contains(&(user_id, installation_id)))
    }

    async fn update_installation_account(
        &self,
        installation_id: i64,
        account: &AccountIdentity,
    ) -> Result<()> {
        if self.fail_account_updates.load(Ordering::SeqCst) {
            bail!("account update failure injected");
        }
        let mut installations = self.installations.write().await;
        if let Some(installation) = installations.get_mut(&installation_id) {
            installation.account = account.clone();
            installation.updated_at = chrono::Utc::now();
        }
        Ok(())
    }
}
