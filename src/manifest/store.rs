//! Document store for project manifests.
//!
//! Thin read/replace layer over the project row: `load` deserializes the
//! stored document, `replace` serializes and persists it. The underlying
//! column write is atomic, so readers only ever observe a committed
//! document.

use crate::api::handlers::AppError;
use crate::manifest::models::ProjectManifest;
use crate::store::PlatformStore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ManifestStore {
    store: Arc<dyn PlatformStore>,
}

impl ManifestStore {
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self { store }
    }

    /// Load a project's manifest. An absent or empty document yields an
    /// empty manifest; only malformed YAML is an error.
    pub async fn load(&self, project_id: Uuid) -> Result<ProjectManifest, AppError> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        ProjectManifest::decode(&project.manifest_yaml)
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))
    }

    /// Serialize and persist a manifest, replacing the prior document.
    pub async fn replace(
        &self,
        project_id: Uuid,
        manifest: &ProjectManifest,
    ) -> Result<(), AppError> {
        let yaml = manifest
            .encode()
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
        self.store
            .update_project_manifest(project_id, &yaml)
            .await?;
        Ok(())
    }
}
