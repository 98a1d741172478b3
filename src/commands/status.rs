//! `machineshop status`

use anyhow::{Result, bail};

use crate::cli::StatusArgs;
use crate::config::Settings;
use crate::store::{FileStatusStore, StatusRecord};
use crate::ui;

const REASON_WIDTH: usize = 72;

pub fn run(settings: &Settings, args: &StatusArgs) -> Result<()> {
    let store = FileStatusStore::new(settings.status_dir.clone());

    let records = match &args.name {
        Some(name) => {
            let identity = super::identity(args.namespace.as_deref(), name);
            match store.load(&identity)? {
                Some(record) => vec![record],
                None => bail!("No status recorded for '{}'", identity),
            }
        }
        None => store.list()?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        ui::info("No statuses recorded yet");
        return Ok(());
    }

    ui::header("Resource status");
    for record in &records {
        print_record(record, args.name.is_some());
    }
    Ok(())
}

fn print_record(record: &StatusRecord, detailed: bool) {
    let status = &record.status;
    let when = status.observed_at.format("%Y-%m-%d %H:%M:%S UTC");
    println!("  {:<32} {:<12} {}", record.identity, ui::phase(status), when);

    if let Some(version) = &status.toolchain_version {
        ui::kv("terraform", version);
    }
    if let Some(stage) = status.stage {
        ui::kv("stage", &stage.to_string());
    }
    if let Some(reason) = &status.reason {
        let reason = if detailed {
            reason.clone()
        } else {
            ui::truncate(reason, REASON_WIDTH)
        };
        ui::kv("reason", &reason);
    }
}
