//! Core types for module reconciliation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Declared intent of one infrastructure module resource.
///
/// Read-only input to a pass. Accepts both snake_case and the camelCase
/// field names used by resource manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Exact Terraform version to run
    #[serde(alias = "terraformVersion", alias = "toolchainVersion")]
    pub toolchain_version: String,
    /// Template name, relative to the template directory
    #[serde(alias = "templateName")]
    pub template: String,
    /// `key=value` parameters substituted into the template
    #[serde(default, alias = "moduleParameters")]
    pub module: Vec<String>,
    /// `key=value` backend configuration, may hold secret references
    #[serde(default, alias = "backendParameters")]
    pub backend: Vec<String>,
    /// `key=value` apply variables, may hold secret references
    #[serde(default, alias = "secretParameters")]
    pub secrets: Vec<String>,
    /// Raw lines for `terraform.tfvars`
    #[serde(default)]
    pub variables: Vec<String>,
}

/// Subtree holding namespaced workspaces. Names cannot start with a dot, so
/// it never collides with a plain identity's directory.
pub const NAMESPACES_DIR: &str = ".namespaces";

/// Identity of a resource. Keys workspaces, logs, locks and status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Resource name
    pub name: String,
    /// Optional namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ResourceIdentity {
    /// Identity without a namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Identity inside a namespace.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Check that name and namespace are single safe path components.
    pub fn validate(&self) -> Result<(), String> {
        check_component("name", &self.name)?;
        if let Some(namespace) = &self.namespace {
            check_component("namespace", namespace)?;
        }
        Ok(())
    }

    /// Workspace path relative to the base: `name`, or
    /// `.namespaces/namespace/name` for namespaced identities.
    ///
    /// No identity's path is a prefix of another's.
    pub fn relative_path(&self) -> PathBuf {
        match &self.namespace {
            Some(namespace) => PathBuf::from(NAMESPACES_DIR)
                .join(namespace)
                .join(&self.name),
            None => PathBuf::from(&self.name),
        }
    }

    /// Lock and display key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn check_component(what: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{what} is empty"));
    }
    if value.starts_with('.') || value.contains(['/', '\\', '\0']) {
        return Err(format!("{what} '{value}' is not a valid path component"));
    }
    Ok(())
}

/// Stage of a pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Fetch the spec
    Load,
    /// Obtain a secret store credential
    Credentials,
    /// Substitute secret references
    Secrets,
    /// Render the module call
    Render,
    /// Materialize the workspace
    Workspace,
    /// Acquire the Terraform binary
    Toolchain,
    /// `terraform init`
    Init,
    /// `terraform apply`
    Apply,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Credentials => "credentials",
            Self::Secrets => "secrets",
            Self::Render => "render",
            Self::Workspace => "workspace",
            Self::Toolchain => "toolchain",
            Self::Init => "init",
            Self::Apply => "apply",
        };
        write!(f, "{name}")
    }
}

/// Observable phase of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// A pass is running
    Reconciling,
    /// Last pass applied successfully
    Done,
    /// Last pass failed
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconciling => write!(f, "Reconciling"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Status reported for a resource.
///
/// `reason` is built from error messages, which name keys, paths and
/// stages but never secret values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Current phase
    pub phase: Phase,
    /// Stage that failed, for `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Human-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Terraform version used, for `Done`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain_version: Option<String>,
    /// When the status was produced
    pub observed_at: DateTime<Utc>,
}

impl Status {
    /// A pass has started.
    pub fn reconciling() -> Self {
        Self {
            phase: Phase::Reconciling,
            stage: None,
            reason: None,
            toolchain_version: None,
            observed_at: Utc::now(),
        }
    }

    /// A pass applied successfully.
    pub fn done(toolchain_version: impl Into<String>) -> Self {
        Self {
            phase: Phase::Done,
            stage: None,
            reason: Some("applied".to_string()),
            toolchain_version: Some(toolchain_version.into()),
            observed_at: Utc::now(),
        }
    }

    /// A pass failed at `stage`.
    pub fn failed(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            phase: Phase::Failed,
            stage: Some(stage),
            reason: Some(reason.into()),
            toolchain_version: None,
            observed_at: Utc::now(),
        }
    }

    /// Whether this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_camel_case_aliases() {
        let spec: ModuleSpec = toml::from_str(
            r#"
terraformVersion = "1.5.0"
template = "module.tf.tmpl"
moduleParameters = ["region=eu-west-1"]
backend = ["bucket=state"]
secrets = ["db_pass=kv/data/app:password"]
variables = ["x=1"]
"#,
        )
        .unwrap();

        assert_eq!(spec.toolchain_version, "1.5.0");
        assert_eq!(spec.module, vec!["region=eu-west-1"]);
        assert_eq!(spec.secrets, vec!["db_pass=kv/data/app:password"]);
    }

    #[test]
    fn test_spec_defaults_lists() {
        let spec: ModuleSpec =
            toml::from_str("toolchain_version = \"1.5.0\"\ntemplate = \"t\"\n").unwrap();
        assert!(spec.module.is_empty());
        assert!(spec.variables.is_empty());
    }

    #[test]
    fn test_identity_paths() {
        assert_eq!(
            ResourceIdentity::new("app").relative_path(),
            PathBuf::from("app")
        );
        assert_eq!(
            ResourceIdentity::namespaced("team", "app").relative_path(),
            PathBuf::from(".namespaces").join("team").join("app")
        );
        assert_eq!(ResourceIdentity::namespaced("team", "app").key(), "team/app");
    }

    #[test]
    fn test_identity_validate() {
        assert!(ResourceIdentity::new("app-1").validate().is_ok());
        assert!(ResourceIdentity::new("").validate().is_err());
        assert!(ResourceIdentity::new("..").validate().is_err());
        assert!(ResourceIdentity::new("a/b").validate().is_err());
        assert!(ResourceIdentity::namespaced("..", "app").validate().is_err());
    }

    #[test]
    fn test_identity_rejects_hidden_components() {
        assert!(ResourceIdentity::namespaced("team", ".terraform").validate().is_err());
        assert!(ResourceIdentity::new(".namespaces").validate().is_err());
        assert!(ResourceIdentity::namespaced(".git", "app").validate().is_err());
        assert!(ResourceIdentity::new("app.v2").validate().is_ok());
    }

    #[test]
    fn test_identity_paths_never_nest() {
        let ids = [
            ResourceIdentity::new("team"),
            ResourceIdentity::new("app"),
            ResourceIdentity::namespaced("team", "app"),
            ResourceIdentity::namespaced("team", "db"),
            ResourceIdentity::namespaced("app", "team"),
        ];
        for a in &ids {
            for b in &ids {
                if a != b {
                    assert!(
                        !a.relative_path().starts_with(b.relative_path()),
                        "{a} nests under {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_status_constructors() {
        let failed = Status::failed(Stage::Secrets, "db_pass");
        assert_eq!(failed.phase, Phase::Failed);
        assert!(failed.is_terminal());
        assert!(!Status::reconciling().is_terminal());
        assert_eq!(Status::done("1.5.0").toolchain_version.as_deref(), Some("1.5.0"));
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Secrets < Stage::Init);
        assert!(Stage::Init < Stage::Apply);
        assert_eq!(Stage::Toolchain.to_string(), "toolchain");
    }
}
