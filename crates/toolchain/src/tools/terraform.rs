//! Terraform-specific installation logic.
//!
//! Terraform releases are zip archives holding a single `terraform`
//! executable (plus, in recent versions, a license file).

use crate::error::{Error, Result};
use crate::platform;
use crate::tools::ToolInstaller;
use crate::types::{InstallOptions, Product};
use std::fs;
use std::io::{Cursor, Read, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Terraform installer.
pub struct TerraformInstaller;

impl TerraformInstaller {
    /// Create a new Terraform installer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn binary_file_name(&self) -> String {
        format!(
            "{}{}",
            Product::Terraform.binary_name(),
            platform::executable_extension()
        )
    }

    /// Pull the executable out of a release zip.
    fn extract(&self, archive: &[u8]) -> Result<Vec<u8>> {
        let binary_name = self.binary_file_name();
        let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;

        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            let is_match = Path::new(file.name())
                .file_name()
                .is_some_and(|n| n == binary_name.as_str());

            if is_match && !file.is_dir() {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)
                    .map_err(|e| Error::ExtractionFailed(e.to_string()))?;
                return Ok(contents);
            }
        }

        Err(Error::ExtractionFailed(format!(
            "'{}' not found in release archive",
            binary_name
        )))
    }
}

impl Default for TerraformInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolInstaller for TerraformInstaller {
    fn binary_path(&self, version_dir: &Path) -> PathBuf {
        version_dir.join(self.binary_file_name())
    }

    fn install(
        &self,
        archive: &[u8],
        version: &str,
        version_dir: &Path,
        options: &InstallOptions,
    ) -> Result<PathBuf> {
        let binary = self.extract(archive)?;

        fs::create_dir_all(version_dir).map_err(|e| Error::io(version_dir, e))?;
        let binary_path = self.binary_path(version_dir);

        // Stage next to the target so the final rename stays on one filesystem.
        let mut staged =
            tempfile::NamedTempFile::new_in(version_dir).map_err(|e| Error::io(version_dir, e))?;
        staged
            .write_all(&binary)
            .map_err(|e| Error::io(staged.path(), e))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| Error::io(staged.path(), e))?;

        #[cfg(unix)]
        {
            let perms = fs::Permissions::from_mode(0o755);
            fs::set_permissions(staged.path(), perms).map_err(|e| Error::io(staged.path(), e))?;
        }

        staged
            .persist(&binary_path)
            .map_err(|e| Error::io(&binary_path, e.error))?;

        if options.verify {
            self.verify(&binary_path, version)?;
        }

        Ok(binary_path)
    }

    fn verify(&self, path: &Path, version: &str) -> Result<()> {
        let output = Command::new(path)
            .arg("version")
            .env("CHECKPOINT_DISABLE", "1")
            .output()
            .map_err(|e| Error::VerificationFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::VerificationFailed {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Output format: "Terraform v1.5.0\non linux_amd64"
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .map(|v| v.trim_start_matches('v').to_string());

        match reported {
            Some(v) if v == version => Ok(()),
            Some(v) => Err(Error::VerificationFailed {
                path: path.to_path_buf(),
                message: format!("expected version {}, binary reports {}", version, v),
            }),
            None => Err(Error::VerificationFailed {
                path: path.to_path_buf(),
                message: "could not read version output".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            for (name, data) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn test_extract_found() {
        let archive = zip_with(&[
            ("LICENSE.txt", b"license"),
            (TerraformInstaller::new().binary_file_name().as_str(), b"tf binary"),
        ]);
        let data = TerraformInstaller::new().extract(&archive).unwrap();
        assert_eq!(data, b"tf binary");
    }

    #[test]
    fn test_extract_not_found() {
        let archive = zip_with(&[("LICENSE.txt", b"license")]);
        let result = TerraformInstaller::new().extract(&archive);
        match result {
            Err(Error::ExtractionFailed(msg)) => assert!(msg.contains("not found")),
            other => panic!("Expected ExtractionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_invalid_archive() {
        let result = TerraformInstaller::new().extract(&[0, 1, 2, 3]);
        assert!(matches!(result, Err(Error::ExtractionFailed(_))));
    }

    #[test]
    fn test_install_places_binary() {
        let dir = tempfile::tempdir().unwrap();
        let version_dir = dir.path().join("terraform").join("1.5.0");
        let installer = TerraformInstaller::new();
        let archive = zip_with(&[(installer.binary_file_name().as_str(), b"tf binary")]);

        let path = installer
            .install(&archive, "1.5.0", &version_dir, &InstallOptions::new().verify(false))
            .unwrap();

        assert_eq!(path, installer.binary_path(&version_dir));
        assert_eq!(fs::read(&path).unwrap(), b"tf binary");

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_install_overwrites_previous_binary() {
        let dir = tempfile::tempdir().unwrap();
        let installer = TerraformInstaller::new();
        let options = InstallOptions::new().verify(false);
        let name = installer.binary_file_name();

        installer
            .install(&zip_with(&[(name.as_str(), b"old")]), "1.5.0", dir.path(), &options)
            .unwrap();
        let path = installer
            .install(&zip_with(&[(name.as_str(), b"new")]), "1.5.0", dir.path(), &options)
            .unwrap();

        assert_eq!(fs::read(path).unwrap(), b"new");
        // Only the binary remains; staging files are renamed away.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_verify_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let result = TerraformInstaller::new().verify(&dir.path().join("terraform"), "1.5.0");
        assert!(matches!(result, Err(Error::VerificationFailed { .. })));
    }
}
