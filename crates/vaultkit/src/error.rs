//! Error types for secret resolution.

use thiserror::Error;

/// Result type alias using the vaultkit Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while obtaining credentials or reading secrets.
///
/// Messages carry keys, references and addresses. They never carry
/// tokens or secret values.
#[derive(Debug, Error)]
pub enum Error {
    /// Parameter entry is not of the form `key=value`.
    #[error("malformed parameter entry #{index}: expected key=value")]
    MalformedEntry {
        /// Zero-based position of the entry in its list
        index: usize,
    },

    /// Value looked like a reference but could not be parsed.
    #[error("invalid secret reference '{reference}': {message}")]
    InvalidReference {
        /// The offending reference
        reference: String,
        /// What is wrong with it
        message: String,
    },

    /// Secret references are present but no credentials are configured.
    #[error(
        "no secret store credentials configured (set VAULT_ADDR, VAULT_NAMESPACE and either VAULT_TOKEN or VAULT_ROLE_ID/VAULT_SECRET_ID)"
    )]
    MissingCredentials,

    /// App-role login was attempted and failed.
    #[error("app-role login to {address} failed: {message}")]
    Login {
        /// Secret store address
        address: String,
        /// Failure description
        message: String,
    },

    /// HTTP request to the secret store failed.
    #[error("secret store request failed: {message}")]
    Http {
        /// Failure description
        message: String,
        /// HTTP status code, if one was received
        status: Option<u16>,
    },

    /// Secret path does not exist.
    #[error("secret not found at {path}")]
    NotFound {
        /// KV path that was read
        path: String,
    },

    /// Secret exists but lacks the requested field.
    #[error("secret at {path} has no field '{field}'")]
    FieldNotFound {
        /// KV path that was read
        path: String,
        /// Missing field name
        field: String,
    },

    /// Response body did not have the expected shape.
    #[error("invalid response from secret store: {0}")]
    InvalidResponse(String),

    /// Resolution of one parameter failed.
    #[error("failed to resolve secret parameter '{key}': {source}")]
    Resolution {
        /// Parameter key whose value could not be resolved
        key: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Wrap an error with the parameter key it belongs to.
    pub fn for_key(key: impl Into<String>, source: Self) -> Self {
        Self::Resolution {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Parameter key this error is attributed to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Resolution { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether the failure is about credentials rather than a single secret.
    pub fn is_credential_error(&self) -> bool {
        match self {
            Self::MissingCredentials | Self::Login { .. } => true,
            Self::Resolution { source, .. } => source.is_credential_error(),
            _ => false,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(format!("HTTP {code}"), Some(code)),
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::http(other.to_string(), None),
        }
    }
}
