//! `machineshop reconcile`

use anyhow::{Context as _, Result, bail};
use reconcile::{Event, Outcome};

use crate::Context;
use crate::cli::ReconcileArgs;
use crate::config::Settings;
use crate::ui;

pub fn run(ctx: &Context, settings: &Settings, args: ReconcileArgs) -> Result<()> {
    let jobs = args.jobs.unwrap_or(settings.jobs).max(1);
    let events: Vec<Event> = args
        .names
        .iter()
        .map(|name| Event::new(super::identity(args.namespace.as_deref(), name)))
        .collect();

    if !ctx.quiet {
        ui::header("Reconciling");
        ui::kv("resources", &settings.resources_dir.display().to_string());
        ui::kv("workspaces", &settings.workspace_root.display().to_string());
        ui::kv("jobs", &jobs.to_string());
        println!();
    }

    let controller = super::controller(settings);
    let results = controller
        .handle_all(&events, jobs)
        .context("Failed to start reconcile workers")?;

    let mut failed = 0;
    for (identity, outcome) in &results {
        match outcome {
            Outcome::Done(report) => {
                ui::success(&format!(
                    "{}: applied with terraform {}",
                    identity, report.toolchain.version
                ));
                if !report.defaulted.is_empty() && !ctx.quiet {
                    ui::dim(&format!(
                        "rendered empty: {}",
                        report.defaulted.join(", ")
                    ));
                }
                if ctx.verbose > 0 {
                    ui::dim(&format!("log: {}", report.engine.log.display()));
                }
            }
            Outcome::NotFound => {
                ui::warn(&format!("{identity}: no such resource"));
            }
            Outcome::Failed(err) => {
                failed += 1;
                ui::error(&format!("{}: {} failed: {}", identity, err.stage(), err));
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} passes failed", failed, results.len());
    }
    Ok(())
}
