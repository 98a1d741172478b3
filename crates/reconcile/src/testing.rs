//! Shared fixtures for pipeline and controller tests

use crate::context::{CredentialResolver, StaticCredential, ToolchainProvider};
use crate::engine::{Engine, ExitOutcome, ScriptedRunner};
use crate::pipeline::Pipeline;
use crate::template::TemplateDir;
use crate::types::ModuleSpec;
use crate::workspace::WorkspaceBuilder;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use toolchain::{Product, ToolchainHandle};
use vaultkit::{Credential, CredentialKind, MemoryStore};

pub const MODULE_TEMPLATE: &str =
    "module \"app\" {\n  source = \"./modules/app\"\n  region = \"{{ .region }}\"\n}\n";

/// Toolchain provider that hands out a fixed path.
#[derive(Clone, Default)]
pub struct FakeToolchain {
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl FakeToolchain {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToolchainProvider for FakeToolchain {
    fn acquire(&self, version: &str) -> toolchain::Result<ToolchainHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(toolchain::Error::VersionNotFound {
                product: "terraform".to_string(),
                version: version.to_string(),
            });
        }
        let version = toolchain::parse_version(version)?;
        Ok(ToolchainHandle {
            product: Product::Terraform,
            path: PathBuf::from(format!("/cache/terraform/{version}/terraform")),
            version,
            cached: true,
        })
    }
}

/// Credential resolver whose app-role login is always rejected.
#[derive(Clone, Default)]
pub struct RejectedLogin {
    attempts: Arc<AtomicUsize>,
}

impl RejectedLogin {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl CredentialResolver for RejectedLogin {
    fn resolve(&self) -> vaultkit::Result<Credential> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(vaultkit::Error::Login {
            address: "https://vault".to_string(),
            message: "permission denied".to_string(),
        })
    }
}

/// Scratch directories plus fakes for every external collaborator.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: MemoryStore,
    pub runner: ScriptedRunner,
    pub toolchain: FakeToolchain,
    pub login: Option<RejectedLogin>,
    credential: Credential,
}

impl Harness {
    pub fn new(outcomes: &[ExitOutcome]) -> Self {
        let credential =
            Credential::new(CredentialKind::StaticToken, "https://vault", "team", "s.test");
        Self::with_credential(credential, outcomes)
    }

    pub fn with_credential(credential: Credential, outcomes: &[ExitOutcome]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(
            dir.path().join("templates").join("module.tf.tmpl"),
            MODULE_TEMPLATE,
        )
        .unwrap();

        let store = MemoryStore::new();
        store.insert("kv/data/app:password", "s3cr3t");

        Self {
            dir,
            store,
            runner: ScriptedRunner::new(outcomes),
            toolchain: FakeToolchain::default(),
            login: None,
            credential,
        }
    }

    /// Harness whose credential discovery fails at app-role login.
    pub fn with_rejected_login(outcomes: &[ExitOutcome]) -> Self {
        let mut harness = Self::with_credential(Credential::missing(), outcomes);
        harness.login = Some(RejectedLogin::default());
        harness
    }

    pub fn pipeline(&self) -> Pipeline {
        let root = self.dir.path();
        let credentials: Box<dyn CredentialResolver> = match &self.login {
            Some(login) => Box::new(login.clone()),
            None => Box::new(StaticCredential(self.credential.clone())),
        };
        Pipeline::new(
            credentials,
            Box::new(self.store.clone()),
            Box::new(TemplateDir::new(root.join("templates"))),
            WorkspaceBuilder::new(root.join("workspaces")),
            Box::new(self.toolchain.clone()),
            Engine::new(Box::new(self.runner.clone()), root.join("logs")),
        )
    }
}

/// The reference resource: one module parameter, one backend setting, one
/// secret reference and one variable.
pub fn scenario_spec() -> ModuleSpec {
    ModuleSpec {
        toolchain_version: "1.5.0".to_string(),
        template: "module.tf.tmpl".to_string(),
        module: vec!["region=eu-west-1".to_string()],
        backend: vec!["bucket=state".to_string()],
        secrets: vec!["db_pass=kv/data/app:password".to_string()],
        variables: vec!["x=1".to_string()],
    }
}
