//! Pass failure taxonomy

use crate::template::TemplateError;
use crate::types::Stage;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed resource input: bad entries, names or versions
    Input,
    /// Credentials missing or invalid, or a secret lookup failed
    Resolution,
    /// Filesystem write or permission failure
    Build,
    /// Toolchain could not be resolved or installed
    Toolchain,
    /// `init` or `apply` failed
    Execution,
    /// The triggering event was cancelled
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Resolution => "resolution",
            Self::Build => "build",
            Self::Toolchain => "toolchain",
            Self::Execution => "execution",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Why a Terraform invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecFailure {
    /// Exited non-zero (`None` when killed by a signal)
    Exit(Option<i32>),
    /// Exceeded its timeout and was killed
    TimedOut,
    /// Cancelled and killed
    Cancelled,
    /// Could not be started or waited on
    Spawn(String),
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit(Some(code)) => write!(f, "exited with status {code}"),
            Self::Exit(None) => write!(f, "terminated by signal"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "was cancelled"),
            Self::Spawn(message) => write!(f, "could not run: {message}"),
        }
    }
}

/// Error that ends a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Resource input is malformed.
    #[error("invalid {what}: {message}")]
    Input {
        /// Stage that found the problem
        stage: Stage,
        /// What was invalid
        what: String,
        /// Description
        message: String,
    },

    /// Resource store could not be read.
    #[error("failed to load resource: {0}")]
    Load(String),

    /// Credential discovery or login failed.
    #[error("credential resolution failed: {0}")]
    Credentials(#[source] vaultkit::Error),

    /// A parameter list could not be resolved.
    #[error("{list} parameters: {source}")]
    Secrets {
        /// Which list (`backend` or `secret`)
        list: &'static str,
        /// Underlying failure, naming the key
        source: vaultkit::Error,
    },

    /// Template loading or rendering failed.
    #[error("template: {0}")]
    Template(#[from] TemplateError),

    /// Workspace materialization failed.
    #[error("failed to {action} {}: {source}", .path.display())]
    Workspace {
        /// Operation that failed
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Toolchain acquisition failed.
    #[error("terraform {version}: {source}")]
    Toolchain {
        /// Requested version
        version: String,
        /// Underlying failure
        source: toolchain::Error,
    },

    /// `init` or `apply` did not succeed.
    #[error("terraform {stage} {failure} (see {})", .log.display())]
    Execution {
        /// `Init` or `Apply`
        stage: Stage,
        /// What happened
        failure: ExecFailure,
        /// Per-target log file holding the output
        log: PathBuf,
    },

    /// Cancellation was observed before `stage` started.
    #[error("cancelled before {0}")]
    Cancelled(Stage),
}

impl ReconcileError {
    /// Broad class of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input { .. } | Self::Load(_) => ErrorKind::Input,
            Self::Credentials(_) => ErrorKind::Resolution,
            Self::Secrets { source, .. } => match source {
                vaultkit::Error::MalformedEntry { .. } => ErrorKind::Input,
                _ => ErrorKind::Resolution,
            },
            Self::Template(e) => match e {
                TemplateError::Io { .. } => ErrorKind::Build,
                _ => ErrorKind::Input,
            },
            Self::Workspace { .. } => ErrorKind::Build,
            Self::Toolchain { source, .. } => match source.category() {
                toolchain::ErrorCategory::Input => ErrorKind::Input,
                _ => ErrorKind::Toolchain,
            },
            Self::Execution { failure, .. } => match failure {
                ExecFailure::Cancelled => ErrorKind::Cancelled,
                _ => ErrorKind::Execution,
            },
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Stage at which the pass stopped.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Load(_) => Stage::Load,
            Self::Input { stage, .. } => *stage,
            Self::Credentials(_) => Stage::Credentials,
            Self::Secrets { .. } => Stage::Secrets,
            Self::Template(_) => Stage::Render,
            Self::Workspace { .. } => Stage::Workspace,
            Self::Toolchain { .. } => Stage::Toolchain,
            Self::Execution { stage, .. } | Self::Cancelled(stage) => *stage,
        }
    }

    /// Malformed input found during `stage`.
    pub fn input(stage: Stage, what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            stage,
            what: what.into(),
            message: message.into(),
        }
    }

    /// Whether the toolchain was never invoked for this pass.
    pub fn before_execution(&self) -> bool {
        self.stage() < Stage::Init
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_failure_names_key() {
        let err = ReconcileError::Secrets {
            list: "secret",
            source: vaultkit::Error::for_key(
                "db_pass",
                vaultkit::Error::NotFound {
                    path: "kv/data/app".to_string(),
                },
            ),
        };
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(err.stage(), Stage::Secrets);
        assert!(err.before_execution());
        assert!(err.to_string().contains("db_pass"));
    }

    #[test]
    fn test_malformed_secret_entry_is_input() {
        let err = ReconcileError::Secrets {
            list: "backend",
            source: vaultkit::Error::MalformedEntry { index: 0 },
        };
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_input_keeps_its_stage() {
        let err = ReconcileError::input(Stage::Render, "module parameters", "entry #0");
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.stage(), Stage::Render);
        assert_eq!(err.to_string(), "invalid module parameters: entry #0");
    }

    #[test]
    fn test_bad_version_is_input() {
        let err = ReconcileError::Toolchain {
            version: "1.x".to_string(),
            source: toolchain::Error::InvalidVersion {
                version: "1.x".to_string(),
                message: "unexpected character".to_string(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.stage(), Stage::Toolchain);
    }

    #[test]
    fn test_execution_failure() {
        let err = ReconcileError::Execution {
            stage: Stage::Init,
            failure: ExecFailure::Exit(Some(1)),
            log: PathBuf::from("/var/log/app.log"),
        };
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(!err.before_execution());
        assert_eq!(
            err.to_string(),
            "terraform init exited with status 1 (see /var/log/app.log)"
        );
    }
}
