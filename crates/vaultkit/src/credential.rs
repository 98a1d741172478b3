//! Credential discovery.
//!
//! Credentials are classified from a fixed set of environment inputs, in
//! priority order:
//!
//! 1. app-role: `VAULT_ADDR`, `VAULT_ROLE_ID`, `VAULT_SECRET_ID`, `VAULT_NAMESPACE`
//! 2. static token: `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_NAMESPACE`
//! 3. missing
//!
//! The resolved [`Credential`] is passed explicitly to the resolver. Nothing
//! here writes to the process environment.

use crate::client::AppRoleLogin;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Secret store address.
pub const VAULT_ADDR: &str = "VAULT_ADDR";
/// Enterprise namespace.
pub const VAULT_NAMESPACE: &str = "VAULT_NAMESPACE";
/// App-role role id.
pub const VAULT_ROLE_ID: &str = "VAULT_ROLE_ID";
/// App-role secret id.
pub const VAULT_SECRET_ID: &str = "VAULT_SECRET_ID";
/// Static bearer token.
pub const VAULT_TOKEN: &str = "VAULT_TOKEN";

/// Read-only view of environment variables.
pub trait Environment {
    /// Value of `name`, if set.
    fn var(&self, name: &str) -> Option<String>;

    /// Value of `name` if set and non-blank, trimmed.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl Environment for HashMap<&str, &str> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| (*v).to_string())
    }
}

/// How a credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Token exchanged via app-role login
    AppRole,
    /// Token taken directly from the environment
    StaticToken,
    /// Nothing configured
    Missing,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppRole => write!(f, "app-role"),
            Self::StaticToken => write!(f, "static-token"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Classified credential inputs, before any network call.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// App-role inputs present.
    AppRole {
        /// Secret store address
        address: String,
        /// Enterprise namespace
        namespace: String,
        /// Role id
        role_id: String,
        /// Secret id
        secret_id: String,
    },
    /// Static token inputs present.
    StaticToken {
        /// Secret store address
        address: String,
        /// Enterprise namespace
        namespace: String,
        /// Bearer token
        token: String,
    },
    /// No usable inputs.
    Missing,
}

impl CredentialSource {
    /// Classify the environment.
    pub fn detect(env: &dyn Environment) -> Self {
        let address = env.non_empty(VAULT_ADDR);
        let namespace = env.non_empty(VAULT_NAMESPACE);

        let (Some(address), Some(namespace)) = (address, namespace) else {
            return Self::Missing;
        };

        if let (Some(role_id), Some(secret_id)) =
            (env.non_empty(VAULT_ROLE_ID), env.non_empty(VAULT_SECRET_ID))
        {
            return Self::AppRole {
                address,
                namespace,
                role_id,
                secret_id,
            };
        }

        if let Some(token) = env.non_empty(VAULT_TOKEN) {
            return Self::StaticToken {
                address,
                namespace,
                token,
            };
        }

        Self::Missing
    }

    /// Kind of credential this source produces.
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::AppRole { .. } => CredentialKind::AppRole,
            Self::StaticToken { .. } => CredentialKind::StaticToken,
            Self::Missing => CredentialKind::Missing,
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppRole {
                address, namespace, ..
            } => f
                .debug_struct("AppRole")
                .field("address", address)
                .field("namespace", namespace)
                .finish_non_exhaustive(),
            Self::StaticToken {
                address, namespace, ..
            } => f
                .debug_struct("StaticToken")
                .field("address", address)
                .field("namespace", namespace)
                .finish_non_exhaustive(),
            Self::Missing => write!(f, "Missing"),
        }
    }
}

/// A usable (or explicitly missing) secret store credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    kind: CredentialKind,
    address: String,
    namespace: String,
    token: String,
}

impl Credential {
    /// Credential carrying a bearer token.
    pub fn new(
        kind: CredentialKind,
        address: impl Into<String>,
        namespace: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            address: address.into(),
            namespace: namespace.into(),
            token: token.into(),
        }
    }

    /// The "nothing configured" credential.
    pub fn missing() -> Self {
        Self {
            kind: CredentialKind::Missing,
            address: String::new(),
            namespace: String::new(),
            token: String::new(),
        }
    }

    /// How this credential was obtained.
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Whether no credential is configured.
    pub fn is_missing(&self) -> bool {
        self.kind == CredentialKind::Missing
    }

    /// Secret store address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Enterprise namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Bearer token. Never log this.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Turns environment inputs into a [`Credential`].
pub struct CredentialProvider<L> {
    login: L,
}

impl<L: AppRoleLogin> CredentialProvider<L> {
    /// Create a provider that performs app-role logins through `login`.
    pub fn new(login: L) -> Self {
        Self { login }
    }

    /// Classify the environment and produce a credential.
    ///
    /// Only the app-role path touches the network. A missing configuration
    /// is not an error here; it becomes one only when a secret reference
    /// needs resolving.
    pub fn resolve(&self, env: &dyn Environment) -> Result<Credential> {
        let source = CredentialSource::detect(env);
        log::debug!("Credential source: {}", source.kind());

        match source {
            CredentialSource::AppRole {
                address,
                namespace,
                role_id,
                secret_id,
            } => {
                let token = self
                    .login
                    .login(&address, &namespace, &role_id, &secret_id)
                    .map_err(|e| match e {
                        Error::Login { .. } => e,
                        other => Error::Login {
                            address: address.clone(),
                            message: other.to_string(),
                        },
                    })?;
                log::info!("Authenticated to {} via app-role", address);
                Ok(Credential::new(
                    CredentialKind::AppRole,
                    address,
                    namespace,
                    token,
                ))
            }
            CredentialSource::StaticToken {
                address,
                namespace,
                token,
            } => Ok(Credential::new(
                CredentialKind::StaticToken,
                address,
                namespace,
                token,
            )),
            CredentialSource::Missing => Ok(Credential::missing()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeLogin {
        result: std::result::Result<&'static str, u16>,
        calls: Cell<usize>,
    }

    impl FakeLogin {
        fn ok(token: &'static str) -> Self {
            Self {
                result: Ok(token),
                calls: Cell::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                result: Err(status),
                calls: Cell::new(0),
            }
        }
    }

    impl AppRoleLogin for &FakeLogin {
        fn login(&self, _: &str, _: &str, _: &str, _: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            match self.result {
                Ok(token) => Ok(token.to_string()),
                Err(status) => Err(Error::http(format!("HTTP {status}"), Some(status))),
            }
        }
    }

    fn env(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
        pairs.iter().copied().collect()
    }

    fn app_role_env() -> HashMap<&'static str, &'static str> {
        env(&[
            (VAULT_ADDR, "https://vault.example.com"),
            (VAULT_NAMESPACE, "team"),
            (VAULT_ROLE_ID, "role"),
            (VAULT_SECRET_ID, "secret"),
            (VAULT_TOKEN, "static"),
        ])
    }

    #[test]
    fn test_detect_app_role_takes_priority() {
        let source = CredentialSource::detect(&app_role_env());
        assert_eq!(source.kind(), CredentialKind::AppRole);
    }

    #[test]
    fn test_detect_static_token() {
        let source = CredentialSource::detect(&env(&[
            (VAULT_ADDR, "https://vault.example.com"),
            (VAULT_NAMESPACE, "team"),
            (VAULT_TOKEN, "s.abc"),
        ]));
        assert_eq!(source.kind(), CredentialKind::StaticToken);
    }

    #[test]
    fn test_detect_missing() {
        assert_eq!(
            CredentialSource::detect(&env(&[])).kind(),
            CredentialKind::Missing
        );
        // Token without namespace is incomplete.
        let partial = env(&[(VAULT_ADDR, "https://vault"), (VAULT_TOKEN, "s.abc")]);
        assert_eq!(
            CredentialSource::detect(&partial).kind(),
            CredentialKind::Missing
        );
        // Blank values count as unset.
        let blank = env(&[
            (VAULT_ADDR, "https://vault"),
            (VAULT_NAMESPACE, "  "),
            (VAULT_TOKEN, "s.abc"),
        ]);
        assert_eq!(
            CredentialSource::detect(&blank).kind(),
            CredentialKind::Missing
        );
    }

    #[test]
    fn test_detect_partial_app_role_falls_back_to_token() {
        let source = CredentialSource::detect(&env(&[
            (VAULT_ADDR, "https://vault"),
            (VAULT_NAMESPACE, "team"),
            (VAULT_ROLE_ID, "role"),
            (VAULT_TOKEN, "s.abc"),
        ]));
        assert_eq!(source.kind(), CredentialKind::StaticToken);
    }

    #[test]
    fn test_debug_redacts() {
        let source = CredentialSource::detect(&app_role_env());
        let rendered = format!("{source:?}");
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("vault.example.com"));

        let credential = Credential::new(CredentialKind::StaticToken, "a", "n", "s.topsecret");
        assert!(!format!("{credential:?}").contains("topsecret"));
    }

    #[test]
    fn test_resolve_app_role() {
        let login = FakeLogin::ok("s.issued");
        let credential = CredentialProvider::new(&login)
            .resolve(&app_role_env())
            .unwrap();
        assert_eq!(credential.kind(), CredentialKind::AppRole);
        assert_eq!(credential.token(), "s.issued");
        assert_eq!(credential.namespace(), "team");
        assert_eq!(login.calls.get(), 1);
    }

    #[test]
    fn test_resolve_login_failure_is_distinct() {
        let login = FakeLogin::failing(403);
        let err = CredentialProvider::new(&login)
            .resolve(&app_role_env())
            .unwrap_err();
        assert!(matches!(err, Error::Login { .. }));
        assert!(!matches!(err, Error::MissingCredentials));
    }

    #[test]
    fn test_resolve_static_token_no_network() {
        let login = FakeLogin::ok("unused");
        let credential = CredentialProvider::new(&login)
            .resolve(&env(&[
                (VAULT_ADDR, "https://vault"),
                (VAULT_NAMESPACE, "team"),
                (VAULT_TOKEN, "s.static"),
            ]))
            .unwrap();
        assert_eq!(credential.kind(), CredentialKind::StaticToken);
        assert_eq!(credential.token(), "s.static");
        assert_eq!(login.calls.get(), 0);
    }

    #[test]
    fn test_resolve_missing_is_not_an_error() {
        let login = FakeLogin::ok("unused");
        let credential = CredentialProvider::new(&login).resolve(&env(&[])).unwrap();
        assert!(credential.is_missing());
        assert_eq!(login.calls.get(), 0);
    }
}
