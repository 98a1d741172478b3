//! SHA-256 verification against a published `SHA256SUMS` document.
//!
//! The document has one `<hex digest>  <file name>` pair per line.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Look up the digest published for `filename`.
#[must_use]
pub fn expected_digest<'a>(sums: &'a str, filename: &str) -> Option<&'a str> {
    sums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?;
        (name == filename).then_some(digest)
    })
}

/// Verify `data` against the digest published for `filename`.
///
/// # Errors
///
/// Returns `Error::ChecksumMismatch` when the digests differ, or
/// `Error::InvalidResponse` when `filename` is not listed.
pub fn verify(data: &[u8], filename: &str, sums: &str) -> Result<()> {
    let expected = expected_digest(sums, filename).ok_or_else(|| {
        Error::InvalidResponse(format!("{} is not listed in the checksum file", filename))
    })?;

    let actual = sha256_hex(data);
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(Error::ChecksumMismatch {
            file: filename.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_expected_digest() {
        let sums = "aaaa  terraform_1.5.0_darwin_arm64.zip\nbbbb  terraform_1.5.0_linux_amd64.zip\n";
        assert_eq!(
            expected_digest(sums, "terraform_1.5.0_linux_amd64.zip"),
            Some("bbbb")
        );
        assert_eq!(expected_digest(sums, "terraform_1.5.0_windows_amd64.zip"), None);
    }

    #[test]
    fn test_verify_ok() {
        let data = b"archive bytes";
        let sums = format!("{}  terraform.zip\n", sha256_hex(data));
        assert!(verify(data, "terraform.zip", &sums).is_ok());
    }

    #[test]
    fn test_verify_mismatch() {
        let sums = format!("{}  terraform.zip\n", sha256_hex(b"other"));
        let result = verify(b"archive bytes", "terraform.zip", &sums);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_verify_unlisted() {
        let result = verify(b"archive bytes", "terraform.zip", "");
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }
}
