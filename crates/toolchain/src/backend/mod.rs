//! Backend traits and implementations for fetching releases.
//!
//! The primary implementation is [`releases::ReleasesBackend`], which talks
//! to `releases.hashicorp.com`.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use toolchain::backend::{Backend, MockBackend};
//! use toolchain::{Platform, Product};
//!
//! let platform = Platform::new("linux", "amd64");
//! let mock = MockBackend::with_terraform("1.5.0", &platform, b"#!/bin/sh\n").unwrap();
//!
//! let release = mock.fetch_release(Product::Terraform, "1.5.0").unwrap();
//! assert_eq!(release.builds.len(), 1);
//! ```

pub mod releases;

use crate::checksum::sha256_hex;
use crate::error::{Error, Result};
use crate::types::{Build, Platform, Product, Release};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Backend trait for fetching releases.
pub trait Backend: Send + Sync {
    /// Fetch the release metadata for one exact version.
    ///
    /// # Errors
    ///
    /// Returns `Error::VersionNotFound` if the version is not published.
    fn fetch_release(&self, product: Product, version: &str) -> Result<Release>;

    /// Fetch the `SHA256SUMS` document for a release.
    fn fetch_checksums(&self, release: &Release) -> Result<String>;

    /// Download a build archive.
    ///
    /// # Errors
    ///
    /// Returns `Error::DownloadFailed` if the archive cannot be downloaded.
    fn download(&self, product: Product, build: &Build) -> Result<Vec<u8>>;
}

/// Mock backend for testing without network access.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    releases: Arc<Mutex<HashMap<(Product, String), Release>>>,
    archives: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    checksums: Arc<Mutex<HashMap<String, String>>>,
    downloads: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a release.
    pub fn add_release(&mut self, release: Release) {
        let mut releases = self.releases.lock().unwrap_or_else(PoisonError::into_inner);
        releases.insert((release.product, release.version.clone()), release);
    }

    /// Add archive bytes served for a build file name.
    pub fn add_archive(&mut self, filename: impl Into<String>, data: Vec<u8>) {
        let mut archives = self.archives.lock().unwrap_or_else(PoisonError::into_inner);
        archives.insert(filename.into(), data);
    }

    /// Set the checksum document served for a version.
    pub fn set_checksums(&mut self, version: impl Into<String>, sums: impl Into<String>) {
        let mut checksums = self.checksums.lock().unwrap_or_else(PoisonError::into_inner);
        checksums.insert(version.into(), sums.into());
    }

    /// Number of archive downloads served so far.
    #[must_use]
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Create a mock backend serving one Terraform release for one platform.
    ///
    /// The archive is a real zip containing `binary` under the product's
    /// binary name, with a matching checksum document.
    pub fn with_terraform(version: &str, platform: &Platform, binary: &[u8]) -> Result<Self> {
        let product = Product::Terraform;
        let filename = product.archive_name(version, &platform.os, &platform.arch);
        let archive = zip_single_file(product.binary_name(), binary)?;

        let mut mock = Self::new();
        mock.set_checksums(version, format!("{}  {}\n", sha256_hex(&archive), filename));
        mock.add_archive(filename.clone(), archive);
        mock.add_release(Release {
            product,
            version: version.to_string(),
            shasums: Some(format!("{}_{}_SHA256SUMS", product.name(), version)),
            builds: vec![Build {
                os: platform.os.clone(),
                arch: platform.arch.clone(),
                url: format!("mock://{}", filename),
                filename,
            }],
        });
        Ok(mock)
    }
}

impl Backend for MockBackend {
    fn fetch_release(&self, product: Product, version: &str) -> Result<Release> {
        let releases = self.releases.lock().unwrap_or_else(PoisonError::into_inner);
        releases
            .get(&(product, version.to_string()))
            .cloned()
            .ok_or_else(|| Error::VersionNotFound {
                product: product.to_string(),
                version: version.to_string(),
            })
    }

    fn fetch_checksums(&self, release: &Release) -> Result<String> {
        let checksums = self.checksums.lock().unwrap_or_else(PoisonError::into_inner);
        checksums
            .get(&release.version)
            .cloned()
            .ok_or_else(|| Error::http("mock checksums not configured", Some(404)))
    }

    fn download(&self, product: Product, build: &Build) -> Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let archives = self.archives.lock().unwrap_or_else(PoisonError::into_inner);
        archives
            .get(&build.filename)
            .cloned()
            .ok_or_else(|| Error::DownloadFailed {
                product: product.to_string(),
                message: format!("mock archive not configured: {}", build.filename),
            })
    }
}

/// Build an in-memory zip holding a single file.
fn zip_single_file(name: &str, contents: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o755);
        zip.start_file(name, options).map_err(archive_error)?;
        zip.write_all(contents).map_err(archive_error)?;
        zip.finish().map_err(archive_error)?;
    }
    Ok(buffer)
}

fn archive_error(e: impl std::fmt::Display) -> Error {
    Error::Other(format!("building archive: {e}"))
}
