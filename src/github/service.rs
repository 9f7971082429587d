//! GitHub App installation tracking and account resolution.

use crate::api::handlers::AppError;
use crate::github::client::{GitHubApi, RepoInfo};
use crate::github::webhook::{SignatureVerifier, WebhookEvent};
use crate::store::{AccountIdentity, Installation, PlatformStore};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct InstallationService {
    store: Arc<dyn PlatformStore>,
    github: Arc<dyn GitHubApi>,
    verifier: SignatureVerifier,
}

impl InstallationService {
    pub fn new(
        store: Arc<dyn PlatformStore>,
        github: Arc<dyn GitHubApi>,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            store,
            github,
            verifier,
        }
    }

    /// Handle a signed installation webhook delivery.
    ///
    /// `installation.created` registers the installation with the
    /// authoritative login from the event; `installation.deleted` removes
    /// it along with its user links. Other actions are acknowledged and
    /// ignored.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<(), AppError> {
        if !self.verifier.verify(payload, signature) {
            return Err(AppError::Forbidden("Invalid webhook signature".to_string()));
        }

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|_| AppError::BadRequest("Invalid webhook payload".to_string()))?;

        let Some(installation) = event.installation else {
            debug!(action = %event.action, "Ignoring webhook without installation");
            return Ok(());
        };

        match event.action.as_str() {
            "created" => {
                let account = match &installation.account {
                    Some(account) => AccountIdentity::Resolved(account.login.clone()),
                    None => AccountIdentity::Unresolved,
                };
                let account_type = installation
                    .account
                    .as_ref()
                    .map(|a| a.kind.clone())
                    .unwrap_or_else(|| "User".to_string());
                let mut record =
                    Installation::new(installation.id, account, account_type);
                record.permissions = installation.permissions.to_string();
                self.store.upsert_installation(&record).await?;
                info!(installation_id = installation.id, "Installation registered");
            }
            "deleted" => {
                self.store.delete_installation(installation.id).await?;
                info!(installation_id = installation.id, "Installation removed");
            }
            other => {
                debug!(action = %other, "Ignoring installation action");
            }
        }
        Ok(())
    }

    /// List the installations linked to a user.
    ///
    /// Any installation without an authoritative login is re-resolved on
    /// the way out. When resolution produces a different identity the
    /// stored row is corrected in the background; the response never waits
    /// on that write and a failed write is only logged.
    pub async fn list_user_installations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Installation>, AppError> {
        let mut installations = self.store.list_installations_for_user(user_id).await?;

        for installation in &mut installations {
            if !installation.account.needs_resolution() {
                continue;
            }
            let resolved = self.resolve_account_identity(installation.installation_id).await;
            if resolved != installation.account {
                let store = Arc::clone(&self.store);
                let installation_id = installation.installation_id;
                let account = resolved.clone();
                tokio::spawn(async move {
                    if let Err(e) = store
                        .update_installation_account(installation_id, &account)
                        .await
                    {
                        debug!(installation_id, "Failed to persist resolved account: {e:#}");
                    }
                });
                installation.account = resolved;
            }
        }
        Ok(installations)
    }

    /// Link a user to an installation, creating a placeholder installation
    /// row when the webhook that would have registered it never arrived.
    pub async fn link_user_to_installation(
        &self,
        user_id: Uuid,
        installation_id: i64,
    ) -> Result<(), AppError> {
        if self.store.is_user_linked(user_id, installation_id).await? {
            return Ok(());
        }

        if self.store.get_installation(installation_id).await?.is_none() {
            let account = self.resolve_account_identity(installation_id).await;
            let record = Installation::new(installation_id, account, "User".to_string());
            self.store.upsert_installation(&record).await?;
            info!(installation_id, "Installation synthesized on link");
        }

        self.store
            .link_user_to_installation(user_id, installation_id)
            .await?;
        Ok(())
    }

    /// List the repositories the platform credential can write to, for an
    /// installation the user is linked to.
    pub async fn get_repositories(
        &self,
        user_id: Uuid,
        installation_id: i64,
    ) -> Result<Vec<RepoInfo>, AppError> {
        if !self.store.is_user_linked(user_id, installation_id).await? {
            return Err(AppError::NotFound("Installation not found".to_string()));
        }
        let repos = self.github.list_repositories().await?;
        Ok(repos.into_iter().filter(RepoInfo::writable).collect())
    }

    /// Best-effort account resolution for an installation id.
    ///
    /// The provider API has no cheap installation lookup for our credential,
    /// so the owner seen most often across visible repositories stands in
    /// for the account login. Ties keep the owner seen first. When the
    /// listing fails or comes back empty the identity is synthesized from
    /// the installation id.
    async fn resolve_account_identity(&self, installation_id: i64) -> AccountIdentity {
        let repos = match self.github.list_repositories().await {
            Ok(repos) => repos,
            Err(e) => {
                warn!(installation_id, "Repository listing failed: {e:#}");
                return AccountIdentity::Synthesized(format!("installation-{installation_id}"));
            }
        };

        match most_frequent_owner(&repos) {
            Some(owner) => AccountIdentity::Resolved(owner),
            None => AccountIdentity::Synthesized(format!("installation-{installation_id}")),
        }
    }
}

/// The owner login appearing on the most repositories, first seen wins ties.
fn most_frequent_owner(repos: &[RepoInfo]) -> Option<String> {
    let mut tally: Vec<(String, usize)> = Vec::new();
    for repo in repos {
        match tally.iter_mut().find(|(owner, _)| *owner == repo.owner.login) {
            Some((_, count)) => *count += 1,
            None => tally.push((repo.owner.login.clone(), 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (owner, count) in tally {
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((owner, count));
        }
    }
    best.map(|(owner, _)| owner)
}

// ============================================================================
// Tests
// ============================================================================
