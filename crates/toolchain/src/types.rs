//! Core types for toolchain management.
//!
//! Products, platforms, release metadata and the handle returned once a
//! binary is ready to execute.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Products that can be acquired.
///
/// # Example
///
/// ```
/// use toolchain::Product;
///
/// let product = Product::Terraform;
/// assert_eq!(product.name(), "terraform");
/// assert_eq!(product.archive_name("1.5.0", "linux", "amd64"), "terraform_1.5.0_linux_amd64.zip");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    /// HashiCorp Terraform.
    Terraform,
}

impl Product {
    /// Lowercase identifier used in release URLs and cache paths.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
        }
    }

    /// Name of the executable inside the release archive (without extension).
    #[must_use]
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
        }
    }

    /// File name of the release archive for a version and platform.
    #[must_use]
    pub fn archive_name(&self, version: &str, os: &str, arch: &str) -> String {
        format!("{}_{}_{}_{}.zip", self.name(), version, os, arch)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Target platform, named the way the release server names builds.
///
/// # Example
///
/// ```
/// use toolchain::Platform;
///
/// let platform = Platform::new("linux", "amd64");
/// assert_eq!(platform.to_string(), "linux_amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system (e.g., "linux", "darwin", "windows").
    pub os: String,
    /// CPU architecture (e.g., "amd64", "arm64").
    pub arch: String,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

/// A published release of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Product the release belongs to.
    pub product: Product,
    /// Exact version string (e.g., "1.5.0").
    pub version: String,
    /// File name of the SHA256SUMS document, if published.
    pub shasums: Option<String>,
    /// Platform builds.
    pub builds: Vec<Build>,
}

impl Release {
    /// Find the build for a platform.
    #[must_use]
    pub fn find_build(&self, platform: &Platform) -> Option<&Build> {
        self.builds
            .iter()
            .find(|b| b.os == platform.os && b.arch == platform.arch)
    }
}

/// A single platform build within a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Operating system.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Archive file name.
    pub filename: String,
    /// Download URL.
    pub url: String,
}

/// Options controlling installation.
///
/// # Example
///
/// ```
/// use toolchain::InstallOptions;
///
/// let options = InstallOptions::new().force(true).verify(false);
/// assert!(options.force);
/// assert!(!options.verify);
/// ```
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Re-download even when the version is already cached.
    pub force: bool,
    /// Run the installed binary once to confirm it reports the pinned version.
    pub verify: bool,
    /// Timeout applied to each HTTP request.
    pub timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            force: false,
            verify: true,
            timeout: Duration::from_secs(300),
        }
    }
}

impl InstallOptions {
    /// Create new install options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to force reinstall.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set whether to verify the binary after installation.
    #[must_use]
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set the per-request HTTP timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An executable toolchain binary pinned to one exact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainHandle {
    /// The product.
    pub product: Product,
    /// Exact version.
    pub version: String,
    /// Path to the executable.
    pub path: PathBuf,
    /// Whether the binary came from the cache rather than a fresh download.
    pub cached: bool,
}

impl fmt::Display for ToolchainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.product, self.version, self.path.display())
    }
}
