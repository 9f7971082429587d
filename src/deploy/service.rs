//! Desired-state reconciliation: project lifecycle and declarations.
//!
//! Every write goes through the same sequence: authorize, load the
//! manifest, mutate it, persist it, notify the pipeline. Declarations
//! notify without waiting; project removal waits, because deleting the
//! row with live resources still deployed would strand them.

use crate::api::handlers::AppError;
use crate::deploy::dispatch::{DispatchEmitter, DispatchPayload};
use crate::manifest::{AddonSpec, ApplicationSpec, ManifestStore, ProjectManifest};
use crate::store::{PlatformStore, Project};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct DeployService {
    store: Arc<dyn PlatformStore>,
    manifests: ManifestStore,
    emitter: Arc<dyn DispatchEmitter>,
    dispatch_owner: String,
    dispatch_repo: String,
}

impl DeployService {
    pub fn new(
        store: Arc<dyn PlatformStore>,
        emitter: Arc<dyn DispatchEmitter>,
        dispatch_owner: String,
        dispatch_repo: String,
    ) -> Self {
        let manifests = ManifestStore::new(Arc::clone(&store));
        Self {
            store,
            manifests,
            emitter,
            dispatch_owner,
            dispatch_repo,
        }
    }

    /// Load a project and check that `user_id` owns it.
    ///
    /// A project owned by someone else comes back `Forbidden`, not
    /// `NotFound`: ids are not secret, ownership is the boundary.
    async fn authorize(&self, user_id: Uuid, project_id: Uuid) -> Result<Project, AppError> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
        if project.owner_id != user_id {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        Ok(project)
    }

    /// Create a project with an empty manifest. Project names are unique
    /// per owner.
    pub async fn create_project(
        &self,
        user_id: Uuid,
        name: &str,
        github_repo: &str,
    ) -> Result<Project, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Project name is required".to_string()));
        }
        if self
            .store
            .get_project_by_owner_and_name(user_id, name)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest(format!(
                "Project '{name}' already exists"
            )));
        }

        let manifest_yaml = ProjectManifest::default()
            .encode()
            .map_err(anyhow::Error::from)?;
        let project = Project::new(
            name.to_string(),
            user_id,
            github_repo.to_string(),
            manifest_yaml,
        );
        self.store.create_project(&project).await?;
        info!(project = %project.name, "Project created");
        Ok(project)
    }

    pub async fn list_projects(&self, user_id: Uuid) -> Result<Vec<Project>, AppError> {
        Ok(self.store.list_projects_for_owner(user_id).await?)
    }

    pub async fn get_project(&self, user_id: Uuid, project_id: Uuid) -> Result<Project, AppError> {
        self.authorize(user_id, project_id).await
    }

    /// The project's current desired-state document.
    pub async fn project_config(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<ProjectManifest, AppError> {
        self.authorize(user_id, project_id).await?;
        self.manifests.load(project_id).await
    }

    /// Declare an application: upsert it into the manifest, persist, and
    /// notify the pipeline without waiting for the notification.
    pub async fn declare_application(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        spec: ApplicationSpec,
    ) -> Result<ProjectManifest, AppError> {
        let project = self.authorize(user_id, project_id).await?;

        let mut manifest = self.manifests.load(project_id).await?;
        let replaced = manifest.upsert_application(spec.clone());
        self.manifests.replace(project_id, &manifest).await?;
        info!(
            project = %project.name,
            application = %spec.name,
            replaced,
            "Application declared"
        );

        self.dispatch_in_background(DispatchPayload::apply_application(&project.name, &spec));
        Ok(manifest)
    }

    /// Declare an addon. Same flow as [`declare_application`].
    ///
    /// [`declare_application`]: DeployService::declare_application
    pub async fn declare_addon(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        spec: AddonSpec,
    ) -> Result<ProjectManifest, AppError> {
        let project = self.authorize(user_id, project_id).await?;

        let mut manifest = self.manifests.load(project_id).await?;
        let replaced = manifest.upsert_addon(spec.clone());
        self.manifests.replace(project_id, &manifest).await?;
        info!(
            project = %project.name,
            addon = %spec.name,
            replaced,
            "Addon declared"
        );

        self.dispatch_in_background(DispatchPayload::apply_addon(&project.name, &spec));
        Ok(manifest)
    }

    /// Delete a project.
    ///
    /// The removal dispatch is awaited before the row is deleted; if the
    /// pipeline cannot be told to tear the resources down, the project
    /// stays.
    pub async fn delete_project(&self, user_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        let project = self.authorize(user_id, project_id).await?;

        let payload = DispatchPayload::remove_project(&project.name);
        self.emitter
            .dispatch(&self.dispatch_owner, &self.dispatch_repo, payload)
            .await
            .map_err(|e| AppError::Internal(e.context("Failed to dispatch project removal")))?;

        self.store.delete_project(project_id).await?;
        info!(project = %project.name, "Project deleted");
        Ok(())
    }

    /// Forward a payload to the pipeline without tying its fate to the
    /// request. The manifest write already committed, so a payload that
    /// fails to build is logged like a failed send, never surfaced.
    fn dispatch_in_background(&self, payload: anyhow::Result<DispatchPayload>) {
        let emitter = Arc::clone(&self.emitter);
        let owner = self.dispatch_owner.clone();
        let repo = self.dispatch_repo.clone();
        tokio::spawn(async move {
            let payload = match payload {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to build dispatch payload: {e:#}");
                    return;
                }
            };
            let path = payload.path.clone();
            if let Err(e) = emitter.dispatch(&owner, &repo, payload).await {
                warn!(%path, "Pipeline dispatch failed: {e:#}");
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
