//! Product-specific installation logic.
//!
//! Each product has a [`ToolInstaller`] that knows how to unpack its release
//! archive, place the binary and check that it runs.
//!
//! - [`terraform::TerraformInstaller`] - HashiCorp Terraform

pub mod terraform;

use crate::error::Result;
use crate::types::InstallOptions;
use std::path::{Path, PathBuf};

/// Trait for product-specific installation logic.
pub trait ToolInstaller: Send + Sync {
    /// Path the binary occupies inside a version directory.
    fn binary_path(&self, version_dir: &Path) -> PathBuf;

    /// Install the product from a downloaded release archive.
    ///
    /// The binary is placed atomically at [`ToolInstaller::binary_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The archive does not contain the binary
    /// - The version directory cannot be created
    /// - Writing or renaming the binary fails
    /// - Verification is enabled and fails
    fn install(
        &self,
        archive: &[u8],
        version: &str,
        version_dir: &Path,
        options: &InstallOptions,
    ) -> Result<PathBuf>;

    /// Run the binary and confirm it reports `version`.
    fn verify(&self, path: &Path, version: &str) -> Result<()>;
}
