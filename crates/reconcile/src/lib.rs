//! # reconcile
//!
//! Turn a declared infrastructure module into an applied Terraform
//! workspace.
//!
//! ## Core Concepts
//!
//! - **ModuleSpec**: the declared intent (version, template, parameters)
//! - **Pipeline**: one pass of resolve, render, materialize, acquire, init, apply
//! - **Engine**: the `init` then `apply` state machine over a [`ProcessRunner`]
//! - **Controller**: fetches specs, serializes passes per identity, reports status
//!
//! ## Collaborator Traits
//!
//! - [`ResourceStore`]: where specs come from
//! - [`StatusReporter`]: where outcomes go
//! - [`TemplateSource`]: where templates come from
//! - [`ToolchainProvider`]: how binaries are acquired
//! - [`CredentialResolver`]: how secret store credentials are obtained
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{Controller, Event, ResourceIdentity};
//!
//! let controller = Controller::new(resources, status, pipeline);
//! let outcome = controller.handle(&Event::new(ResourceIdentity::new("app")));
//! ```

pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod lock;
pub mod params;
pub mod pipeline;
pub mod template;
pub mod types;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use context::{
    CancelToken, CredentialResolver, EnvCredentials, MemoryResources, MemoryStatus,
    ResourceStore, StaticCredential, StatusReporter, TemplateSource, ToolchainProvider,
};
pub use controller::{Controller, Event, Outcome};
pub use engine::{
    CommandRunner, Engine, EngineReport, EngineTimeouts, ExecState, ExitOutcome, Invocation,
    ProcessRunner, ScriptedRunner,
};
pub use error::{ErrorKind, ExecFailure, ReconcileError};
pub use lock::{RunGuard, RunLocks};
pub use params::ParameterMap;
pub use pipeline::{PassReport, Pipeline};
pub use template::{Rendered, Renderer, TemplateDir, TemplateError};
pub use types::{ModuleSpec, Phase, ResourceIdentity, Stage, Status};
pub use workspace::{Workspace, WorkspaceBuilder};
