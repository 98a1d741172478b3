//! `machineshop toolchain`

use anyhow::{Context as _, Result};
use toolchain::{Error as ToolchainError, Product};

use crate::Context;
use crate::cli::ToolchainCommand;
use crate::config::Settings;
use crate::ui;

pub fn run(ctx: &Context, settings: &Settings, cmd: ToolchainCommand) -> Result<()> {
    match cmd {
        ToolchainCommand::Install { tf_version, force } => {
            install(ctx, settings, &tf_version, force)
        }
        ToolchainCommand::List => list(ctx, settings),
    }
}

fn install(ctx: &Context, settings: &Settings, version: &str, force: bool) -> Result<()> {
    let client = super::toolchain_client(settings, force);
    if !ctx.quiet {
        ui::info(&format!("Installing terraform {version}"));
    }

    let handle = match client.acquire(Product::Terraform, version) {
        Ok(handle) => handle,
        Err(err) => {
            ui::dim(&hint(&err));
            return Err(err).with_context(|| format!("Failed to install terraform {version}"));
        }
    };

    if handle.cached {
        ui::success(&format!("terraform {} already installed", handle.version));
    } else {
        ui::success(&format!("Installed terraform {}", handle.version));
    }
    ui::kv("path", &handle.path.display().to_string());
    Ok(())
}

fn list(ctx: &Context, settings: &Settings) -> Result<()> {
    let client = super::toolchain_client(settings, false);
    let versions = client
        .installed_versions(Product::Terraform)
        .context("Failed to list installed toolchains")?;

    if versions.is_empty() {
        ui::info("No terraform versions installed");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Installed terraform versions");
    }
    for version in versions {
        println!("  {version}");
    }
    if ctx.verbose > 0 {
        ui::dim(&format!("cache: {}", client.root().display()));
    }
    Ok(())
}

/// Category and advice line shown under a failed install
fn hint(err: &ToolchainError) -> String {
    let category = err.category();
    format!("{}: {}", category, category.advice())
}
