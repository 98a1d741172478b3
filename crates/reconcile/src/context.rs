//! Collaborator traits and the cancellation token
//!
//! These traits keep the pipeline independent of where resources, statuses,
//! templates, credentials and binaries come from.

use crate::template::TemplateError;
use crate::types::{ModuleSpec, ResourceIdentity, Status};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use toolchain::{Product, ToolchainHandle};
use vaultkit::{AppRoleLogin, Credential, CredentialProvider, Environment};

/// Source of declared resources.
pub trait ResourceStore: Send + Sync {
    /// Current spec for `identity`, or `None` if the resource no longer exists.
    fn fetch(&self, identity: &ResourceIdentity) -> Result<Option<ModuleSpec>, String>;
}

/// Sink for observable resource status.
pub trait StatusReporter: Send + Sync {
    /// Record the latest status of `identity`.
    fn report(&self, identity: &ResourceIdentity, status: &Status) -> Result<(), String>;
}

/// Source of template text by name.
pub trait TemplateSource: Send + Sync {
    /// Load a template.
    fn load(&self, name: &str) -> Result<String, TemplateError>;
}

/// Acquires a Terraform binary for an exact version.
pub trait ToolchainProvider: Send + Sync {
    /// Acquire `version`.
    fn acquire(&self, version: &str) -> toolchain::Result<ToolchainHandle>;
}

impl ToolchainProvider for toolchain::Client {
    fn acquire(&self, version: &str) -> toolchain::Result<ToolchainHandle> {
        toolchain::Client::acquire(self, Product::Terraform, version)
    }
}

/// Produces the secret store credential for a pass.
pub trait CredentialResolver: Send + Sync {
    /// Resolve a fresh credential.
    fn resolve(&self) -> vaultkit::Result<Credential>;
}

/// Credentials discovered from environment inputs on every call.
pub struct EnvCredentials<L, E> {
    provider: CredentialProvider<L>,
    env: E,
}

impl<L: AppRoleLogin, E> EnvCredentials<L, E> {
    /// Discover credentials from `env`, logging in through `login`.
    pub fn new(login: L, env: E) -> Self {
        Self {
            provider: CredentialProvider::new(login),
            env,
        }
    }
}

impl<L, E> CredentialResolver for EnvCredentials<L, E>
where
    L: AppRoleLogin + Send + Sync,
    E: Environment + Send + Sync,
{
    fn resolve(&self) -> vaultkit::Result<Credential> {
        self.provider.resolve(&self.env)
    }
}

/// A fixed credential.
#[derive(Debug, Clone)]
pub struct StaticCredential(pub Credential);

impl CredentialResolver for StaticCredential {
    fn resolve(&self) -> vaultkit::Result<Credential> {
        Ok(self.0.clone())
    }
}

/// Status reporter that keeps the history of every identity in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatus {
    history: Arc<Mutex<HashMap<ResourceIdentity, Vec<Status>>>>,
}

impl MemoryStatus {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// All statuses reported for `identity`, oldest first.
    pub fn history(&self, identity: &ResourceIdentity) -> Vec<Status> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.get(identity).cloned().unwrap_or_default()
    }

    /// Latest status for `identity`.
    pub fn latest(&self, identity: &ResourceIdentity) -> Option<Status> {
        self.history(identity).pop()
    }
}

impl StatusReporter for MemoryStatus {
    fn report(&self, identity: &ResourceIdentity, status: &Status) -> Result<(), String> {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .entry(identity.clone())
            .or_default()
            .push(status.clone());
        Ok(())
    }
}

/// Resources held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    specs: Arc<Mutex<HashMap<ResourceIdentity, ModuleSpec>>>,
}

impl MemoryResources {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub fn insert(&self, identity: ResourceIdentity, spec: ModuleSpec) {
        let mut specs = self.specs.lock().unwrap_or_else(PoisonError::into_inner);
        specs.insert(identity, spec);
    }

    /// Remove a resource.
    pub fn remove(&self, identity: &ResourceIdentity) {
        let mut specs = self.specs.lock().unwrap_or_else(PoisonError::into_inner);
        specs.remove(identity);
    }
}

impl ResourceStore for MemoryResources {
    fn fetch(&self, identity: &ResourceIdentity) -> Result<Option<ModuleSpec>, String> {
        let specs = self.specs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(specs.get(identity).cloned())
    }
}

/// Shared cancellation flag for one event's lifetime.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Env;
    use vaultkit::CredentialKind;

    struct NoLogin;

    impl AppRoleLogin for NoLogin {
        fn login(&self, address: &str, _: &str, _: &str, _: &str) -> vaultkit::Result<String> {
            Err(vaultkit::Error::Login {
                address: address.to_string(),
                message: "disabled".to_string(),
            })
        }
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_memory_status_history() {
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("app");
        status.report(&id, &Status::reconciling()).unwrap();
        status.report(&id, &Status::done("1.5.0")).unwrap();

        assert_eq!(status.history(&id).len(), 2);
        assert!(status.latest(&id).unwrap().is_terminal());
        assert!(status.latest(&ResourceIdentity::new("other")).is_none());
    }

    #[test]
    fn test_memory_resources() {
        let store = MemoryResources::new();
        let id = ResourceIdentity::new("app");
        assert!(store.fetch(&id).unwrap().is_none());
        store.insert(id.clone(), ModuleSpec::default());
        assert!(store.fetch(&id).unwrap().is_some());
        store.remove(&id);
        assert!(store.fetch(&id).unwrap().is_none());
    }

    #[test]
    fn test_env_credentials_static_token() {
        let env: Env<String, String> = [
            ("VAULT_ADDR", "https://vault"),
            ("VAULT_NAMESPACE", "team"),
            ("VAULT_TOKEN", "s.abc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let credential = EnvCredentials::new(NoLogin, env).resolve().unwrap();
        assert_eq!(credential.kind(), CredentialKind::StaticToken);
    }

    #[test]
    fn test_env_credentials_login_failure_is_not_missing() {
        let env: Env<String, String> = [
            ("VAULT_ADDR", "https://vault"),
            ("VAULT_NAMESPACE", "team"),
            ("VAULT_ROLE_ID", "role"),
            ("VAULT_SECRET_ID", "secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let err = EnvCredentials::new(NoLogin, env).resolve().unwrap_err();
        assert!(matches!(err, vaultkit::Error::Login { .. }));

        let nothing = EnvCredentials::new(NoLogin, Env::<String, String>::new())
            .resolve()
            .unwrap();
        assert!(nothing.is_missing());
    }
}
