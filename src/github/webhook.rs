//! Webhook signature verification and installation-lifecycle event types.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw payload bytes
//! and sends the hex digest in `X-Hub-Signature-256` as `sha256=<hex>`.
//! Only verified payloads may mutate installation state.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook deliveries against the shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    /// A verifier with no secret accepts everything (explicit insecure
    /// mode for local development).
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Check a signature header against the raw, unparsed payload bytes.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        let Some(ref secret) = self.secret else {
            return true;
        };
        let Some(hex_digest) = signature_header.strip_prefix("sha256=") else {
            return false;
        };
        let Ok(digest) = hex::decode(hex_digest) else {
            return false;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        // verify_slice is a constant-time comparison
        mac.verify_slice(&digest).is_ok()
    }
}

/// Compute the `sha256=<hex>` signature for a payload. Used by tests and
/// callers that need to sign outbound deliveries.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// An installation-lifecycle webhook delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub action: String,
    pub installation: Option<InstallationEvent>,
    #[serde(default)]
    pub sender: serde_json::Value,
}

/// The installation object of a webhook delivery.
#[derive(Debug, Deserialize)]
pub struct InstallationEvent {
    pub id: i64,
    pub account: Option<AccountInfo>,
    #[serde(default)]
    pub permissions: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub login: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// ============================================================================
// Tests
// ============================================================================
