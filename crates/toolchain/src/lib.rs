//! # toolchain
//!
//! Acquire exact, checksum-verified releases of infrastructure tooling.
//!
//! This crate provides functionality for:
//! - Resolving one exact version (never "latest compatible")
//! - Downloading the platform build from the release server with retries
//! - Verifying the archive against the published SHA-256 sums
//! - Installing into a shared, version-keyed cache with atomic placement
//! - Deduplicating concurrent acquisitions of the same version
//!
//! ## Example
//!
//! ```no_run
//! use toolchain::{Client, InstallOptions, Product};
//!
//! let client = Client::new(Client::default_root(), InstallOptions::default());
//! let handle = client.acquire(Product::Terraform, "1.5.0").expect("acquisition failed");
//! println!("{}", handle);
//! ```
//!
//! ## Cache layout
//!
//! ```text
//! <root>/terraform/1.5.0/terraform
//! <root>/terraform/1.6.2/terraform
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod checksum;
pub mod error;
pub mod platform;
pub mod retry;
pub mod tools;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use retry::RetryConfig;
pub use types::{Build, InstallOptions, Platform, Product, Release, ToolchainHandle};

use backend::Backend;
pub use backend::MockBackend;
use backend::releases::ReleasesBackend;
use retry::with_retry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tools::ToolInstaller;
use tools::terraform::TerraformInstaller;

/// Parse and normalize an exact version pin.
///
/// A leading `v` is accepted (`v1.5.0` ≡ `1.5.0`); ranges and partial
/// versions are rejected.
///
/// # Errors
///
/// Returns `Error::InvalidVersion` if the string is not a full semantic version.
pub fn parse_version(version: &str) -> Result<String> {
    let trimmed = version.trim();
    let candidate = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(candidate)
        .map(|v| v.to_string())
        .map_err(|e| Error::InvalidVersion {
            version: version.to_string(),
            message: e.to_string(),
        })
}

/// High-level client for toolchain acquisition.
pub struct Client {
    backend: Box<dyn Backend>,
    root: PathBuf,
    options: InstallOptions,
    retry: RetryConfig,
    platform: Option<Platform>,
    locks: Mutex<HashMap<(Product, String), Arc<Mutex<()>>>>,
}

impl Client {
    /// Create a client against the public release server.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, options: InstallOptions) -> Self {
        let backend = ReleasesBackend::new(options.timeout);
        Self::with_backend(Box::new(backend), root, options)
    }

    /// Create a client with a custom backend (useful for testing and mirrors).
    #[must_use]
    pub fn with_backend(
        backend: Box<dyn Backend>,
        root: impl Into<PathBuf>,
        options: InstallOptions,
    ) -> Self {
        Self {
            backend,
            root: root.into(),
            options,
            retry: RetryConfig::default(),
            platform: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Pin the target platform instead of detecting it.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Default cache root (`<cache dir>/machineshop/toolchains`).
    #[must_use]
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("machineshop")
            .join("toolchains")
    }

    /// Cache root of this client.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Acquisition
    // =========================================================================

    /// Acquire the exact `version` of `product`, returning an executable path.
    ///
    /// A cached binary is reused. Otherwise the release is resolved,
    /// downloaded, checksum-verified and installed. Concurrent calls for the
    /// same version are serialized so only one of them downloads.
    pub fn acquire(&self, product: Product, version: &str) -> Result<ToolchainHandle> {
        let version = parse_version(version)?;

        let slot = self.version_lock(product, &version);
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let installer = self.get_installer(product);
        let version_dir = self.version_dir(product, &version);
        let binary = installer.binary_path(&version_dir);

        if binary.is_file() && !self.options.force {
            log::debug!("Using cached {} {} at {}", product, version, binary.display());
            return Ok(ToolchainHandle {
                product,
                version,
                path: binary,
                cached: true,
            });
        }

        let platform = match &self.platform {
            Some(platform) => platform.clone(),
            None => platform::detect()?,
        };

        log::info!("Acquiring {} {} for {}", product, version, platform);

        let release = with_retry(&self.retry, "fetch release index", || {
            self.backend.fetch_release(product, &version)
        })?;

        let build = release
            .find_build(&platform)
            .ok_or_else(|| Error::UnsupportedPlatform {
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            })?;

        let sums = with_retry(&self.retry, "fetch checksums", || {
            self.backend.fetch_checksums(&release)
        })?;

        let archive = with_retry(&self.retry, "download archive", || {
            self.backend.download(product, build)
        })?;

        checksum::verify(&archive, &build.filename, &sums)?;

        let path = installer.install(&archive, &version, &version_dir, &self.options)?;
        log::info!("Installed {} {} at {}", product, version, path.display());

        Ok(ToolchainHandle {
            product,
            version,
            path,
            cached: false,
        })
    }

    // =========================================================================
    // Cache inspection
    // =========================================================================

    /// List cached versions of a product, oldest first.
    pub fn installed_versions(&self, product: Product) -> Result<Vec<String>> {
        let product_dir = self.root.join(product.name());
        if !product_dir.exists() {
            return Ok(Vec::new());
        }

        let installer = self.get_installer(product);
        let mut versions = Vec::new();
        for entry in fs::read_dir(&product_dir).map_err(|e| Error::io(&product_dir, e))? {
            let entry = entry.map_err(|e| Error::io(&product_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(version) = semver::Version::parse(&name) else {
                continue;
            };
            if installer.binary_path(&entry.path()).is_file() {
                versions.push(version);
            }
        }

        versions.sort();
        Ok(versions.into_iter().map(|v| v.to_string()).collect())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn version_dir(&self, product: Product, version: &str) -> PathBuf {
        self.root.join(product.name()).join(version)
    }

    fn version_lock(&self, product: Product, version: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry((product, version.to_string()))
            .or_default()
            .clone()
    }

    fn get_installer(&self, product: Product) -> Box<dyn ToolInstaller> {
        match product {
            Product::Terraform => Box::new(TerraformInstaller::new()),
        }
    }
}
