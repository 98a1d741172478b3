//! Per-resource workspace materialization

use crate::error::ReconcileError;
use crate::types::{ResourceIdentity, Stage};
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Name of the variables file inside a workspace.
pub const VARS_FILE: &str = "terraform.tfvars";

const DIR_MODE: u32 = 0o755;
const MODULE_MODE: u32 = 0o644;
const VARS_MODE: u32 = 0o600;

/// A materialized workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Workspace directory
    pub dir: PathBuf,
    /// Rendered module call, `<name>.tf`
    pub module_file: PathBuf,
    /// `terraform.tfvars`
    pub vars_file: PathBuf,
}

/// Creates workspaces under a base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceBuilder {
    base: PathBuf,
}

impl WorkspaceBuilder {
    /// Builder rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory for `identity`. Stable across passes, unique per identity.
    pub fn dir_for(&self, identity: &ResourceIdentity) -> PathBuf {
        self.base.join(identity.relative_path())
    }

    /// Write the rendered module call and variables for `identity`.
    ///
    /// Both files are fully overwritten, so equal inputs give byte-identical
    /// files.
    pub fn build(
        &self,
        identity: &ResourceIdentity,
        rendered: &str,
        variables: &[String],
    ) -> Result<Workspace, ReconcileError> {
        identity.validate().map_err(|message| {
            ReconcileError::input(Stage::Workspace, "resource identity", message)
        })?;

        let dir = self.dir_for(identity);
        create_dir(&dir)?;

        let module_file = dir.join(format!("{}.tf", identity.name));
        write_file(&module_file, rendered.as_bytes(), MODULE_MODE)?;

        let vars_file = dir.join(VARS_FILE);
        write_file(&vars_file, variables.join("\n").as_bytes(), VARS_MODE)?;

        log::debug!("Workspace ready at {}", dir.display());
        Ok(Workspace {
            dir,
            module_file,
            vars_file,
        })
    }
}

fn create_dir(dir: &Path) -> Result<(), ReconcileError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    builder.create(dir).map_err(|source| ReconcileError::Workspace {
        action: "create directory",
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, content: &[u8], mode: u32) -> Result<(), ReconcileError> {
    let err = |action: &'static str| {
        move |source| ReconcileError::Workspace {
            action,
            path: path.to_path_buf(),
            source,
        }
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);

    let mut file = options.open(path).map_err(err("open"))?;
    file.write_all(content).map_err(err("write"))?;

    // `mode` only applies on creation; tighten files left by earlier runs.
    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(err("set permissions on"))?;
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
