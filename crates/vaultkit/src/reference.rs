//! Secret reference syntax: `<mount>/data/<path>:<field>`.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+/data/.+:.+$").expect("reference regex is valid"));

/// Whether a parameter value is a secret reference.
pub fn is_secret_reference(value: &str) -> bool {
    REFERENCE_PATTERN.is_match(value)
}

/// A parsed pointer at one field of a KV v2 secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretReference {
    /// API path below `/v1/`, e.g. `kv/data/app`
    pub path: String,
    /// Field inside the secret's data
    pub field: String,
}

impl SecretReference {
    /// Parse a reference. The last `:` separates the field.
    pub fn parse(value: &str) -> Result<Self> {
        if !is_secret_reference(value) {
            return Err(Error::InvalidReference {
                reference: value.to_string(),
                message: "expected <mount>/data/<path>:<field>".to_string(),
            });
        }

        let (path, field) = value
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidReference {
                reference: value.to_string(),
                message: "missing field separator".to_string(),
            })?;

        if !path.contains("/data/") || path.ends_with("/data/") || field.is_empty() {
            return Err(Error::InvalidReference {
                reference: value.to_string(),
                message: "field separator must follow a secret path".to_string(),
            });
        }

        Ok(Self {
            path: path.trim_start_matches('/').to_string(),
            field: field.to_string(),
        })
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.field)
    }
}
