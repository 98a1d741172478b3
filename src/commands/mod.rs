pub mod reconcile;
pub mod render;
pub mod status;
pub mod toolchain;

use ::reconcile::{
    CommandRunner, Controller, Engine, EnvCredentials, Pipeline, ResourceIdentity, TemplateDir,
    WorkspaceBuilder,
};
use ::toolchain::InstallOptions;
use vaultkit::{ProcessEnv, VaultClient};

use crate::config::Settings;
use crate::store::{FileResourceStore, FileStatusStore};

/// Identity for `name`, optionally inside `namespace`.
pub fn identity(namespace: Option<&str>, name: &str) -> ResourceIdentity {
    match namespace {
        Some(namespace) => ResourceIdentity::namespaced(namespace, name),
        None => ResourceIdentity::new(name),
    }
}

/// Toolchain client over the configured cache.
pub fn toolchain_client(settings: &Settings, force: bool) -> ::toolchain::Client {
    let options = InstallOptions::new()
        .force(force)
        .timeout(settings.timeouts.download());
    ::toolchain::Client::new(settings.toolchain_dir.clone(), options)
}

/// Wire the production collaborators into a controller.
pub fn controller(settings: &Settings) -> Controller {
    let vault = VaultClient::new(settings.timeouts.http());
    let credentials = EnvCredentials::new(vault.clone(), ProcessEnv);

    let engine = Engine::new(Box::new(CommandRunner), settings.log_dir.clone())
        .with_timeouts(settings.timeouts.engine());

    let pipeline = Pipeline::new(
        Box::new(credentials),
        Box::new(vault),
        Box::new(TemplateDir::new(settings.template_dir.clone())),
        WorkspaceBuilder::new(settings.workspace_root.clone()),
        Box::new(toolchain_client(settings, false)),
        engine,
    );

    Controller::new(
        Box::new(FileResourceStore::new(settings.resources_dir.clone())),
        Box::new(FileStatusStore::new(settings.status_dir.clone())),
        pipeline,
    )
}
