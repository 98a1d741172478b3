//! One reconciliation pass
//!
//! ```text
//! credentials -> secrets -> render -> workspace -> toolchain -> init -> apply
//! ```
//!
//! Every stage returns a typed error and the first failure ends the pass.
//! Nothing reaches the toolchain unless all earlier stages succeeded.

use crate::context::{CancelToken, CredentialResolver, TemplateSource, ToolchainProvider};
use crate::engine::{Engine, EngineReport};
use crate::error::ReconcileError;
use crate::params::ParameterMap;
use crate::template::{Rendered, Renderer};
use crate::types::{ModuleSpec, ResourceIdentity, Stage};
use crate::workspace::{Workspace, WorkspaceBuilder};
use toolchain::ToolchainHandle;
use vaultkit::{Credential, SecretStore, has_references, resolve_parameters};

/// What a successful pass produced.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Resource reconciled
    pub identity: ResourceIdentity,
    /// Binary used
    pub toolchain: ToolchainHandle,
    /// Workspace applied
    pub workspace: Workspace,
    /// Execution details
    pub engine: EngineReport,
    /// Template keys rendered empty
    pub defaulted: Vec<String>,
}

/// The reconciliation chain with its collaborators.
pub struct Pipeline {
    credentials: Box<dyn CredentialResolver>,
    secrets: Box<dyn SecretStore>,
    templates: Box<dyn TemplateSource>,
    renderer: Renderer,
    workspaces: WorkspaceBuilder,
    toolchain: Box<dyn ToolchainProvider>,
    engine: Engine,
}

impl Pipeline {
    /// Assemble a pipeline.
    pub fn new(
        credentials: Box<dyn CredentialResolver>,
        secrets: Box<dyn SecretStore>,
        templates: Box<dyn TemplateSource>,
        workspaces: WorkspaceBuilder,
        toolchain: Box<dyn ToolchainProvider>,
        engine: Engine,
    ) -> Self {
        Self {
            credentials,
            secrets,
            templates,
            renderer: Renderer::default(),
            workspaces,
            toolchain,
            engine,
        }
    }

    /// Use a renderer with different delimiters.
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Render the module call for `spec` without touching secrets or the toolchain.
    pub fn render(&self, spec: &ModuleSpec) -> Result<Rendered, ReconcileError> {
        let params = ParameterMap::parse("module", &spec.module)?;
        let template = self.templates.load(&spec.template)?;
        Ok(self.renderer.render(&template, &params)?)
    }

    /// Run one pass for `identity`.
    pub fn run(
        &self,
        identity: &ResourceIdentity,
        spec: &ModuleSpec,
        cancel: &CancelToken,
    ) -> Result<PassReport, ReconcileError> {
        identity.validate().map_err(|message| {
            ReconcileError::input(Stage::Load, "resource identity", message)
        })?;
        toolchain::parse_version(&spec.toolchain_version).map_err(|e| {
            ReconcileError::input(Stage::Load, "toolchain version", e.to_string())
        })?;

        checkpoint(cancel, Stage::Credentials)?;
        let credential = if has_references(&spec.backend) || has_references(&spec.secrets) {
            self.credentials
                .resolve()
                .map_err(ReconcileError::Credentials)?
        } else {
            Credential::missing()
        };
        log::debug!("{}: credential source {}", identity, credential.kind());

        checkpoint(cancel, Stage::Secrets)?;
        let backend = resolve_parameters(&spec.backend, &credential, self.secrets.as_ref())
            .map_err(|source| ReconcileError::Secrets {
                list: "backend",
                source,
            })?;
        let secrets = resolve_parameters(&spec.secrets, &credential, self.secrets.as_ref())
            .map_err(|source| ReconcileError::Secrets {
                list: "secret",
                source,
            })?;

        checkpoint(cancel, Stage::Render)?;
        let rendered = self.render(spec)?;
        if !rendered.defaulted.is_empty() {
            log::warn!(
                "{}: template '{}' rendered missing keys as empty: {}",
                identity,
                spec.template,
                rendered.defaulted.join(", ")
            );
        }

        checkpoint(cancel, Stage::Workspace)?;
        let workspace = self
            .workspaces
            .build(identity, &rendered.text, &spec.variables)?;

        checkpoint(cancel, Stage::Toolchain)?;
        let toolchain = self
            .toolchain
            .acquire(&spec.toolchain_version)
            .map_err(|source| ReconcileError::Toolchain {
                version: spec.toolchain_version.clone(),
                source,
            })?;
        log::debug!("{}: using {}", identity, toolchain);

        let engine = self
            .engine
            .run(
                identity,
                &toolchain.path,
                &workspace,
                &backend,
                &secrets,
                cancel,
            )
            .into_result()?;

        Ok(PassReport {
            identity: identity.clone(),
            toolchain,
            workspace,
            engine,
            defaulted: rendered.defaulted,
        })
    }
}

fn checkpoint(cancel: &CancelToken, next: Stage) -> Result<(), ReconcileError> {
    if cancel.is_cancelled() {
        return Err(ReconcileError::Cancelled(next));
    }
    Ok(())
}
