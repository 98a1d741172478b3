//! File-backed resource specs and statuses
//!
//! ```text
//! <resources_dir>/[namespace/]<name>.toml   ModuleSpec, read-only
//! <state_dir>/status/[namespace/]<name>.toml  last reported Status
//! ```

use anyhow::{Context, Result};
use reconcile::{ModuleSpec, ResourceIdentity, ResourceStore, Status, StatusReporter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn toml_path(root: &Path, identity: &ResourceIdentity) -> Result<PathBuf, String> {
    identity.validate()?;
    let file = format!("{}.toml", identity.name);
    Ok(match &identity.namespace {
        Some(namespace) => root.join(namespace).join(file),
        None => root.join(file),
    })
}

// ============================================================================
// Resources
// ============================================================================

/// Reads resource specs from TOML files.
#[derive(Debug, Clone)]
pub struct FileResourceStore {
    dir: PathBuf,
}

impl FileResourceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ResourceStore for FileResourceStore {
    fn fetch(&self, identity: &ResourceIdentity) -> Result<Option<ModuleSpec>, String> {
        let path = toml_path(&self.dir, identity)?;
        if !path.exists() {
            log::debug!("No resource file at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let spec = toml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?;
        Ok(Some(spec))
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// One status file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub identity: ResourceIdentity,
    pub status: Status,
}

/// Writes the latest status of each resource to its own TOML file.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Last recorded status of `identity`.
    pub fn load(&self, identity: &ResourceIdentity) -> Result<Option<StatusRecord>> {
        let path = toml_path(&self.dir, identity).map_err(anyhow::Error::msg)?;
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// Every recorded status, sorted by identity.
    pub fn list(&self) -> Result<Vec<StatusRecord>> {
        let mut records = Vec::new();
        if !self.dir.exists() {
            return Ok(records);
        }

        for entry in read_dir(&self.dir)? {
            if entry.is_dir() {
                for nested in read_dir(&entry)? {
                    if is_toml(&nested) {
                        records.push(read_record(&nested)?);
                    }
                }
            } else if is_toml(&entry) {
                records.push(read_record(&entry)?);
            }
        }

        records.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(records)
    }
}

impl StatusReporter for FileStatusStore {
    fn report(&self, identity: &ResourceIdentity, status: &Status) -> Result<(), String> {
        let path = toml_path(&self.dir, identity)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }

        let record = StatusRecord {
            identity: identity.clone(),
            status: status.clone(),
        };
        let content = toml::to_string_pretty(&record).map_err(|e| e.to_string())?;

        // Readers never see a half-written file.
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(|e| format!("failed to write {}: {}", tmp.display(), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| format!("failed to replace {}: {}", path.display(), e))?;

        log::debug!("Recorded {} status at {}", status.phase, path.display());
        Ok(())
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

fn is_toml(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "toml")
}

fn read_record(path: &Path) -> Result<StatusRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read status file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse status file: {}", path.display()))
}
