//! Secret store access.
//!
//! [`VaultClient`] speaks the two calls the resolver needs:
//!
//! - `POST {addr}/v1/auth/approle/login` to exchange role/secret ids for a token
//! - `GET {addr}/v1/{mount}/data/{path}` to read a KV v2 secret
//!
//! [`MemoryStore`] serves secrets from memory for tests.

use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::reference::SecretReference;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const USER_AGENT: &str = concat!("machineshop-vaultkit/", env!("CARGO_PKG_VERSION"));

/// Reads one field of one secret.
pub trait SecretStore: Send + Sync {
    /// Read `reference` using `credential`.
    fn read(&self, credential: &Credential, reference: &SecretReference) -> Result<String>;
}

/// Exchanges app-role ids for a bearer token.
pub trait AppRoleLogin {
    /// Log in and return the client token.
    fn login(&self, address: &str, namespace: &str, role_id: &str, secret_id: &str)
    -> Result<String>;
}

/// Blocking HTTP client for a Vault-compatible secret store.
#[derive(Debug, Clone)]
pub struct VaultClient {
    agent: ureq::Agent,
}

impl VaultClient {
    /// Create a client whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    fn url(address: &str, path: &str) -> String {
        format!(
            "{}/v1/{}",
            address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl SecretStore for VaultClient {
    fn read(&self, credential: &Credential, reference: &SecretReference) -> Result<String> {
        if credential.is_missing() {
            return Err(Error::MissingCredentials);
        }

        let url = Self::url(credential.address(), &reference.path);
        log::debug!("Reading secret {}", reference);

        let response = self
            .agent
            .get(&url)
            .header("X-Vault-Token", credential.token())
            .header("X-Vault-Namespace", credential.namespace())
            .header("User-Agent", USER_AGENT)
            .call();

        let body: serde_json::Value = match response {
            Ok(mut response) => response.body_mut().read_json()?,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(Error::NotFound {
                    path: reference.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        extract_field(&body, reference)
    }
}

impl AppRoleLogin for VaultClient {
    fn login(
        &self,
        address: &str,
        namespace: &str,
        role_id: &str,
        secret_id: &str,
    ) -> Result<String> {
        let url = Self::url(address, "auth/approle/login");
        let payload = serde_json::json!({ "role_id": role_id, "secret_id": secret_id });

        let response: LoginResponse = self
            .agent
            .post(&url)
            .header("X-Vault-Namespace", namespace)
            .header("User-Agent", USER_AGENT)
            .send_json(&payload)
            .map_err(|e| Error::Login {
                address: address.to_string(),
                message: Error::from(e).to_string(),
            })?
            .body_mut()
            .read_json()
            .map_err(|e| Error::Login {
                address: address.to_string(),
                message: e.to_string(),
            })?;

        response
            .auth
            .map(|auth| auth.client_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Login {
                address: address.to_string(),
                message: "response carried no client token".to_string(),
            })
    }
}

/// Pull `data.data[field]` out of a KV v2 read response.
fn extract_field(body: &serde_json::Value, reference: &SecretReference) -> Result<String> {
    let data = body
        .pointer("/data/data")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| {
            Error::InvalidResponse(format!("{} is not a KV v2 secret", reference.path))
        })?;

    match data.get(&reference.field) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Null) | None => Err(Error::FieldNotFound {
            path: reference.path.clone(),
            field: reference.field.clone(),
        }),
        Some(other) => Ok(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Debug, Deserialize)]
struct LoginAuth {
    client_token: String,
}

/// In-memory secret store for testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    secrets: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for `reference` (`<path>:<field>`).
    pub fn insert(&self, reference: impl Into<String>, value: impl Into<String>) {
        let mut secrets = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        secrets.insert(reference.into(), value.into());
    }

    /// Make reads of `reference` fail with a server error.
    pub fn fail(&self, reference: impl Into<String>) {
        let mut failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        failing.insert(reference.into());
    }

    /// Number of reads served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SecretStore for MemoryStore {
    fn read(&self, credential: &Credential, reference: &SecretReference) -> Result<String> {
        if credential.is_missing() {
            return Err(Error::MissingCredentials);
        }
        self.reads.fetch_add(1, Ordering::SeqCst);

        let key = reference.to_string();
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&key) {
            return Err(Error::http("HTTP 500", Some(500)));
        }
        drop(failing);

        let secrets = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        secrets.get(&key).cloned().ok_or_else(|| Error::NotFound {
            path: reference.path.clone(),
        })
    }
}
