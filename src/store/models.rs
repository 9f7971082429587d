//! Persistent row types for users, projects and GitHub App installations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Bcrypt hash; never serialized out of the store layer.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project owned by a user.
///
/// `manifest_yaml` is the serialized desired-state document. It is owned
/// entirely by the reconciliation engine and must not be hand-edited;
/// an empty string decodes to an empty manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    /// External repository reference in `owner/repo` form.
    pub github_repo: String,
    #[serde(skip_serializing)]
    pub manifest_yaml: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with an empty manifest.
    pub fn new(name: String, owner_id: Uuid, github_repo: String, manifest_yaml: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            owner_id,
            github_repo,
            manifest_yaml,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The account identity attached to an installation.
///
/// GitHub webhooks carry an authoritative login; installations created
/// lazily on a link attempt may not have one. Resolution state is modeled
/// explicitly so callers branch on structure instead of comparing against
/// placeholder strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "login", rename_all = "snake_case")]
pub enum AccountIdentity {
    /// No identity is known yet.
    Unresolved,
    /// Authoritative login, taken from the provider.
    Resolved(String),
    /// Best-effort fallback of the form `installation-{id}`; candidates
    /// for re-resolution on the next read.
    Synthesized(String),
}

impl AccountIdentity {
    /// The login to display, if any is known.
    pub fn login(&self) -> Option<&str> {
        match self {
            AccountIdentity::Unresolved => None,
            AccountIdentity::Resolved(login) | AccountIdentity::Synthesized(login) => Some(login),
        }
    }

    /// Whether the resolver should attempt to (re-)resolve this identity.
    /// Only an authoritative login is considered final.
    pub fn needs_resolution(&self) -> bool {
        !matches!(self, AccountIdentity::Resolved(_))
    }

    /// Split into the `(login, source)` column pair used by the store.
    pub fn to_columns(&self) -> (Option<&str>, &'static str) {
        match self {
            AccountIdentity::Unresolved => (None, "unresolved"),
            AccountIdentity::Resolved(login) => (Some(login), "resolved"),
            AccountIdentity::Synthesized(login) => (Some(login), "synthesized"),
        }
    }

    /// Rebuild from the `(login, source)` column pair. Unknown sources and
    /// missing logins both degrade to `Unresolved`.
    pub fn from_columns(login: Option<String>, source: &str) -> Self {
        match (login, source) {
            (Some(login), "resolved") => AccountIdentity::Resolved(login),
            (Some(login), "synthesized") => AccountIdentity::Synthesized(login),
            _ => AccountIdentity::Unresolved,
        }
    }
}

/// A GitHub App installation known to the platform.
///
/// `installation_id` is the provider's opaque numeric id; `permissions`
/// is the raw permissions document from the webhook, stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: Uuid,
    pub installation_id: i64,
    pub account: AccountIdentity,
    pub account_type: String,
    pub permissions: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installation {
    pub fn new(installation_id: i64, account: AccountIdentity, account_type: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            installation_id,
            account,
            account_type,
            permissions: "{}".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
