//! # vaultkit
//!
//! Resolve secret references in `key=value` parameter lists against a
//! Vault-compatible KV v2 store.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vaultkit::{CredentialProvider, ProcessEnv, VaultClient, resolve_parameters};
//!
//! let client = VaultClient::new(Duration::from_secs(30));
//! let credential = CredentialProvider::new(client.clone()).resolve(&ProcessEnv)?;
//!
//! let params = vec!["db_pass=kv/data/app:password".to_string()];
//! let resolved = resolve_parameters(&params, &credential, &client)?;
//! # Ok::<(), vaultkit::Error>(())
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod credential;
pub mod error;
pub mod reference;
pub mod resolver;

pub use client::{AppRoleLogin, MemoryStore, SecretStore, VaultClient};
pub use credential::{
    Credential, CredentialKind, CredentialProvider, CredentialSource, Environment, ProcessEnv,
};
pub use error::{Error, Result};
pub use reference::{SecretReference, is_secret_reference};
pub use resolver::{has_references, resolve_parameters, split_entry};
