//! Settings loaded from `<config_dir>/config.toml`

use anyhow::{Context, Result};
use reconcile::EngineTimeouts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toolchain::InstallOptions;

use crate::paths;

/// Name of the settings file inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

// ============================================================================
// On-disk format
// ============================================================================

/// Settings as written in `config.toml`. Every field is optional.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Directory holding `<name>.toml` resource specs
    pub resources_dir: Option<String>,
    /// Directory holding module templates
    pub template_dir: Option<String>,
    /// Base directory for per-resource workspaces
    pub workspace_root: Option<String>,
    /// Directory for per-resource process logs
    pub log_dir: Option<String>,
    /// Toolchain cache directory
    pub toolchain_dir: Option<String>,
    /// Default parallelism for `reconcile`
    pub jobs: Option<usize>,
    /// `[timeouts]` table
    pub timeouts: Timeouts,
}

/// Bounds on external calls, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Secret store requests
    pub http_secs: u64,
    /// Each toolchain release request and download
    pub download_secs: u64,
    /// `terraform init`
    pub init_secs: u64,
    /// `terraform apply`
    pub apply_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        let engine = EngineTimeouts::default();
        Self {
            http_secs: 30,
            download_secs: InstallOptions::default().timeout.as_secs(),
            init_secs: engine.init.as_secs(),
            apply_secs: engine.apply.as_secs(),
        }
    }
}

impl Timeouts {
    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn engine(&self) -> EngineTimeouts {
        EngineTimeouts {
            init: Duration::from_secs(self.init_secs),
            apply: Duration::from_secs(self.apply_secs),
        }
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Fully resolved settings with every path expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub resources_dir: PathBuf,
    pub template_dir: PathBuf,
    pub workspace_root: PathBuf,
    pub log_dir: PathBuf,
    pub toolchain_dir: PathBuf,
    pub status_dir: PathBuf,
    pub jobs: usize,
    pub timeouts: Timeouts,
}

impl Settings {
    /// Load settings from `path`, or from the default config file.
    ///
    /// A missing default file means defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_dir = paths::config_dir()?;
        let state_dir = paths::state_dir()?;

        let file = match path {
            Some(path) => read_file(path)?,
            None => {
                let default = config_dir.join(CONFIG_FILE);
                if default.exists() {
                    read_file(&default)?
                } else {
                    log::debug!("No config at {}, using defaults", default.display());
                    SettingsFile::default()
                }
            }
        };

        Ok(Self::resolve(file, &config_dir, &state_dir))
    }

    /// Fill unset fields from the config and state directories.
    pub fn resolve(file: SettingsFile, config_dir: &Path, state_dir: &Path) -> Self {
        let or = |value: Option<String>, default: PathBuf| {
            value.map_or(default, |v| paths::expand(&v))
        };

        Self {
            resources_dir: or(file.resources_dir, config_dir.join("resources")),
            template_dir: or(file.template_dir, PathBuf::from("terraform")),
            workspace_root: or(file.workspace_root, PathBuf::from("/tmp/tf")),
            log_dir: or(file.log_dir, state_dir.join("logs")),
            toolchain_dir: or(file.toolchain_dir, toolchain::Client::default_root()),
            status_dir: state_dir.join("status"),
            jobs: file.jobs.unwrap_or(1).max(1),
            timeouts: file.timeouts,
        }
    }
}

fn read_file(path: &Path) -> Result<SettingsFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(file)
}
