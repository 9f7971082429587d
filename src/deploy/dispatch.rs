//! Dispatch payloads sent to the delivery pipeline repository.
//!
//! Every change to a project's desired state is mirrored to the pipeline
//! repo as a `repository_dispatch` event carrying one of these payloads.

use crate::manifest::{AddonSpec, ApplicationSpec};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchAction {
    Apply,
    Remove,
}

/// Client payload of a pipeline dispatch event.
///
/// The `spec` key is always present on the wire; remove events carry
/// an explicit `null`. The entity name never appears inside `spec` —
/// it is already encoded in `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// Resource path within the pipeline's config tree,
    /// e.g. `projects/demo/applications/api`.
    pub path: String,
    pub action: DispatchAction,
    pub spec: Option<serde_json::Value>,
}

impl DispatchPayload {
    pub fn apply_application(project: &str, spec: &ApplicationSpec) -> Result<Self> {
        let mut body = serde_json::Map::new();
        body.insert("tier".to_string(), serde_json::Value::String(spec.tier.clone()));
        body.insert("github".to_string(), serde_json::to_value(&spec.github)?);
        body.insert("build".to_string(), serde_json::to_value(&spec.build)?);
        body.insert("endpoints".to_string(), serde_json::to_value(&spec.endpoints)?);
        Ok(Self {
            path: format!("projects/{}/applications/{}", project, spec.name),
            action: DispatchAction::Apply,
            spec: Some(serde_json::Value::Object(body)),
        })
    }

    pub fn apply_addon(project: &str, spec: &AddonSpec) -> Result<Self> {
        Ok(Self {
            path: format!("projects/{}/addons/{}", project, spec.name),
            action: DispatchAction::Apply,
            spec: Some(serde_json::json!({
                "type": spec.kind,
                "tier": spec.tier,
                "storage": spec.storage,
            })),
        })
    }

    pub fn remove_project(project: &str) -> Self {
        Self {
            path: format!("projects/{}", project),
            action: DispatchAction::Remove,
            spec: None,
        }
    }
}

/// Sink for pipeline dispatch events. The production implementation is
/// `GitHubClient`; tests record payloads in memory instead.
#[async_trait]
pub trait DispatchEmitter: Send + Sync {
    async fn dispatch(&self, owner: &str, repo: &str, payload: DispatchPayload) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{AddonSpec, ApplicationSpec};

    #[test]
    fn test_apply_application_spec_map() {
        let spec = ApplicationSpec {
            name: "api".to_string(),
            tier: "backend".to_string(),
            github: None,
            build: None,
            endpoints: Vec::new(),
        };
        let payload = DispatchPayload::apply_application("demo", &spec).unwrap();
        assert_eq!(payload.path, "projects/demo/applications/api");
        assert_eq!(payload.action, DispatchAction::Apply);

        // The name lives in the path only; the body is the fixed
        // tier/github/build/endpoints map.
        let body = payload.spec.unwrap();
        let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, ["build", "endpoints", "github", "tier"]);
        assert_eq!(body["tier"], "backend");
        assert!(body["github"].is_null());
    }

    #[test]
    fn test_apply_addon_spec_map() {
        let spec = AddonSpec {
            name: "cache".to_string(),
            kind: "redis".to_string(),
            tier: "small".to_string(),
            storage: "1Gi".to_string(),
            config: serde_yaml::Value::Null,
        };
        let payload = DispatchPayload::apply_addon("demo", &spec).unwrap();
        assert_eq!(payload.path, "projects/demo/addons/cache");

        let body = payload.spec.unwrap();
        let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["storage", "tier", "type"]);
        assert_eq!(body["type"], "redis");
        assert_eq!(body["storage"], "1Gi");
    }

    #[test]
    fn test_remove_project_spec_is_explicit_null() {
        let payload = DispatchPayload::remove_project("demo");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["path"], "projects/demo");
        assert_eq!(json["action"], "remove");
        let body = json.as_object().unwrap();
        assert!(body.contains_key("spec"));
        assert!(body["spec"].is_null());
    }
}
