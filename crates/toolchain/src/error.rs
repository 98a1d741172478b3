//! Error types for toolchain operations.
//!
//! Every failure carries an [`ErrorCategory`] so callers can tell a bad
//! version string from a network outage from an unpublished release, and
//! so the retry loop knows which failures are worth another attempt.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for toolchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of toolchain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller supplied something unusable (e.g. a malformed version).
    Input,
    /// Network-related errors (transient, retryable).
    Network,
    /// Platform not supported.
    Platform,
    /// Product or version not published.
    NotFound,
    /// Permission denied during installation.
    Permission,
    /// Archive, checksum or response format error.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Input => "Invalid input",
            Self::Network => "Network connectivity issue",
            Self::Platform => "Unsupported platform",
            Self::NotFound => "Version not found",
            Self::Permission => "Permission denied",
            Self::Format => "Invalid file format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Input => "Use an exact semantic version such as 1.5.0",
            Self::Network => "Check connectivity to the release server and try again",
            Self::Platform => "This toolchain is not published for your platform",
            Self::NotFound => "Verify the requested version has been released",
            Self::Permission => "Check permissions on the toolchain cache directory",
            Self::Format => "The download may be corrupted, try again",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during toolchain operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The version string is not a valid semantic version.
    #[error("invalid version '{version}': {message}")]
    InvalidVersion {
        /// Version as given.
        version: String,
        /// Parser message.
        message: String,
    },

    /// Failed to detect the current platform.
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform {
        /// Operating system.
        os: String,
        /// CPU architecture.
        arch: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    HttpError {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Failed to download a release archive.
    #[error("download failed for {product}: {message}")]
    DownloadFailed {
        /// Product being downloaded.
        product: String,
        /// Error message.
        message: String,
    },

    /// The downloaded archive does not match the published checksum.
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive file name.
        file: String,
        /// Published SHA-256.
        expected: String,
        /// Computed SHA-256.
        actual: String,
    },

    /// Failed to extract the binary from the release archive.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Version not published.
    #[error("version {version} not found for {product}")]
    VersionNotFound {
        /// Product name.
        product: String,
        /// Requested version.
        version: String,
    },

    /// Invalid response from the release server.
    #[error("invalid release response: {0}")]
    InvalidResponse(String),

    /// The installed binary did not run or reported the wrong version.
    #[error("verification of {path} failed: {message}")]
    VerificationFailed {
        /// Installed binary.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::HttpError {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidVersion { .. } => ErrorCategory::Input,
            Error::UnsupportedPlatform { .. } => ErrorCategory::Platform,
            Error::HttpError { status, .. } => match status {
                Some(code) if (400..500).contains(code) && *code != 429 => ErrorCategory::Other,
                _ => ErrorCategory::Network,
            },
            Error::DownloadFailed { .. } => ErrorCategory::Network,
            Error::ChecksumMismatch { .. } => ErrorCategory::Format,
            Error::ExtractionFailed(_) => ErrorCategory::Format,
            Error::Io { source, .. } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    ErrorCategory::Permission
                } else {
                    ErrorCategory::Other
                }
            }
            Error::VersionNotFound { .. } => ErrorCategory::NotFound,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::VerificationFailed { .. } => ErrorCategory::Other,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::HttpError {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::HttpError {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ExtractionFailed(err.to_string())
    }
}
