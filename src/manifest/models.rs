//! The project manifest: the desired-state document listing every
//! application and addon a project should contain.
//!
//! The document is stored as YAML on the project row and is owned entirely
//! by this engine. Entries are identified by `name`, unique within each
//! list; list order is insertion order and carries no priority.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest codec failure.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse manifest document")]
    Decode(#[source] serde_yaml::Error),
    #[error("failed to serialize manifest document")]
    Encode(#[source] serde_yaml::Error),
}

/// The parsed desired-state document for a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub applications: Vec<ApplicationSpec>,
    #[serde(default)]
    pub addons: Vec<AddonSpec>,
}

impl ProjectManifest {
    /// Decode a manifest from its stored YAML form.
    ///
    /// An empty or whitespace-only document decodes to two empty lists;
    /// only malformed YAML is an error.
    pub fn decode(yaml: &str) -> Result<Self, ManifestError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(ManifestError::Decode)
    }

    /// Encode the manifest to its stored YAML form.
    pub fn encode(&self) -> Result<String, ManifestError> {
        serde_yaml::to_string(self).map_err(ManifestError::Encode)
    }

    /// Upsert an application by name.
    ///
    /// Matching is exact and case-sensitive, by linear scan in list order.
    /// An existing entry is replaced in place (same index) — the new spec
    /// fully replaces the old one, omitted optional fields included.
    /// Otherwise the spec is appended. Returns true if an entry was
    /// replaced.
    pub fn upsert_application(&mut self, spec: ApplicationSpec) -> bool {
        match self.applications.iter_mut().find(|a| a.name == spec.name) {
            Some(existing) => {
                *existing = spec;
                true
            }
            None => {
                self.applications.push(spec);
                false
            }
        }
    }

    /// Upsert an addon by name. Same semantics as [`upsert_application`].
    ///
    /// [`upsert_application`]: ProjectManifest::upsert_application
    pub fn upsert_addon(&mut self, spec: AddonSpec) -> bool {
        match self.addons.iter_mut().find(|a| a.name == spec.name) {
            Some(existing) => {
                *existing = spec;
                true
            }
            None => {
                self.addons.push(spec);
                false
            }
        }
    }
}

/// A declared application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<EndpointSpec>,
}

/// Source-control binding of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubBinding {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub installation_id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_paths: Vec<String>,
}

/// A network endpoint exposed by an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub port: u16,
    #[serde(default)]
    pub routes: Vec<String>,
}

/// How an application is built.
///
/// Externally tagged: the wire form is a single-key map such as
/// `{"gradle": {...}}`, so a body naming more than one build system is
/// rejected during deserialization instead of one being picked silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSpec {
    Gradle(GradleBuild),
    Nodejs(NodeBuild),
    React(StaticSiteBuild),
    Vite(StaticSiteBuild),
    Vue(StaticSiteBuild),
    Nextjs(NodeBuild),
    Go(GoBuild),
    Rust(RustBuild),
    Maven(MavenBuild),
    Django(PythonBuild),
    Flask(PythonBuild),
    Docker(DockerBuild),
}

impl BuildSpec {
    /// The wire tag of this build system.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildSpec::Gradle(_) => "gradle",
            BuildSpec::Nodejs(_) => "nodejs",
            BuildSpec::React(_) => "react",
            BuildSpec::Vite(_) => "vite",
            BuildSpec::Vue(_) => "vue",
            BuildSpec::Nextjs(_) => "nextjs",
            BuildSpec::Go(_) => "go",
            BuildSpec::Rust(_) => "rust",
            BuildSpec::Maven(_) => "maven",
            BuildSpec::Django(_) => "django",
            BuildSpec::Flask(_) => "flask",
            BuildSpec::Docker(_) => "docker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradleBuild {
    pub java_version: String,
    #[serde(default)]
    pub jar_output_path: String,
    #[serde(default)]
    pub build_command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBuild {
    pub node_version: String,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub start_command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticSiteBuild {
    pub node_version: String,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub dist_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoBuild {
    pub go_version: String,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub binary_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RustBuild {
    pub rust_version: String,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub binary_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenBuild {
    pub java_version: String,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub jar_output_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonBuild {
    pub python_version: String,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub start_command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerBuild {
    #[serde(default)]
    pub dockerfile_path: String,
    #[serde(default)]
    pub context_path: String,
}

/// A declared addon (managed data-store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tier: String,
    #[serde(default)]
    pub storage: String,
    /// Open-ended configuration, opaque to this engine.
    #[serde(default, skip_serializing_if = "serde_yaml::Value::is_null")]
    pub config: serde_yaml::Value,
}

// ============================================================================
// Tests
// ============================================================================
