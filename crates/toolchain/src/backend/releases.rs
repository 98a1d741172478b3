//! HashiCorp releases backend.
//!
//! Fetches release indexes, checksum documents and build archives from
//! `releases.hashicorp.com`:
//!
//! - `{base}/{product}/{version}/index.json`
//! - `{base}/{product}/{version}/{shasums}`
//! - build URLs as listed in the index

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Build, Product, Release};
use serde::Deserialize;
use std::time::Duration;

/// Maximum archive size (Terraform zips are well under this).
const MAX_BODY_SIZE: u64 = 200 * 1024 * 1024;

const USER_AGENT: &str = concat!("machineshop-toolchain/", env!("CARGO_PKG_VERSION"));

/// Releases backend.
///
/// ```no_run
/// use toolchain::backend::releases::ReleasesBackend;
/// use toolchain::backend::Backend;
/// use toolchain::Product;
/// use std::time::Duration;
///
/// let backend = ReleasesBackend::new(Duration::from_secs(60));
/// let release = backend.fetch_release(Product::Terraform, "1.5.0").unwrap();
/// println!("{} builds", release.builds.len());
/// ```
pub struct ReleasesBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Releases base URL.
    base_url: String,
}

impl ReleasesBackend {
    /// Create a backend against the public release server.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url("https://releases.hashicorp.com", timeout)
    }

    /// Create a backend with a custom base URL (mirrors, testing).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the current base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn index_url(&self, product: Product, version: &str) -> String {
        format!("{}/{}/{}/index.json", self.base_url, product.name(), version)
    }

    fn checksums_url(&self, product: Product, version: &str, shasums: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, product.name(), version, shasums)
    }
}

impl Backend for ReleasesBackend {
    fn fetch_release(&self, product: Product, version: &str) -> Result<Release> {
        let url = self.index_url(product, version);
        log::debug!("Fetching release index {}", url);

        let response = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call();

        let index: ReleaseIndex = match response {
            Ok(mut response) => response.body_mut().read_json()?,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(Error::VersionNotFound {
                    product: product.to_string(),
                    version: version.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if index.version != version {
            return Err(Error::InvalidResponse(format!(
                "asked for {} {}, index describes {}",
                product, version, index.version
            )));
        }

        Ok(index.into_release(product))
    }

    fn fetch_checksums(&self, release: &Release) -> Result<String> {
        let shasums = release.shasums.as_deref().ok_or_else(|| {
            Error::InvalidResponse(format!(
                "{} {} publishes no checksum file",
                release.product, release.version
            ))
        })?;
        let url = self.checksums_url(release.product, &release.version, shasums);
        log::debug!("Fetching checksums {}", url);

        let body = self
            .agent
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .call()?
            .body_mut()
            .read_to_string()?;

        Ok(body)
    }

    fn download(&self, product: Product, build: &Build) -> Result<Vec<u8>> {
        log::info!("Downloading {}", build.url);

        let mut response = self
            .agent
            .get(&build.url)
            .header("Accept", "application/octet-stream")
            .header("User-Agent", USER_AGENT)
            .call()?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| Error::DownloadFailed {
                product: product.to_string(),
                message: e.to_string(),
            })?;

        Ok(bytes)
    }
}

// =============================================================================
// Release index response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ReleaseIndex {
    version: String,
    shasums: Option<String>,
    #[serde(default)]
    builds: Vec<BuildIndex>,
}

#[derive(Debug, Deserialize)]
struct BuildIndex {
    os: String,
    arch: String,
    filename: String,
    url: String,
}

impl ReleaseIndex {
    fn into_release(self, product: Product) -> Release {
        Release {
            product,
            version: self.version,
            shasums: self.shasums,
            builds: self.builds.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<BuildIndex> for Build {
    fn from(b: BuildIndex) -> Self {
        Self {
            os: b.os,
            arch: b.arch,
            filename: b.filename,
            url: b.url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ReleasesBackend {
        ReleasesBackend::new(Duration::from_secs(5))
    }

    #[test]
    fn test_index_url() {
        let url = backend().index_url(Product::Terraform, "1.5.0");
        assert_eq!(url, "https://releases.hashicorp.com/terraform/1.5.0/index.json");
    }

    #[test]
    fn test_checksums_url() {
        let url = backend().checksums_url(Product::Terraform, "1.5.0", "terraform_1.5.0_SHA256SUMS");
        assert_eq!(
            url,
            "https://releases.hashicorp.com/terraform/1.5.0/terraform_1.5.0_SHA256SUMS"
        );
    }

    #[test]
    fn test_custom_base_url_trims_slash() {
        let backend = ReleasesBackend::with_base_url("https://mirror.internal/", Duration::from_secs(5));
        assert_eq!(backend.base_url(), "https://mirror.internal");
    }

    #[test]
    fn test_index_conversion() {
        let index = ReleaseIndex {
            version: "1.5.0".to_string(),
            shasums: Some("terraform_1.5.0_SHA256SUMS".to_string()),
            builds: vec![BuildIndex {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                filename: "terraform_1.5.0_linux_amd64.zip".to_string(),
                url: "https://releases.hashicorp.com/terraform/1.5.0/terraform_1.5.0_linux_amd64.zip"
                    .to_string(),
            }],
        };

        let release = index.into_release(Product::Terraform);
        assert_eq!(release.version, "1.5.0");
        assert_eq!(release.builds.len(), 1);
        assert_eq!(release.builds[0].arch, "amd64");
    }
}
