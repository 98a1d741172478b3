//! `machineshop render`

use anyhow::{Result, bail};
use std::io::Write;

use crate::cli::RenderArgs;
use crate::config::Settings;

/// Print the rendered module call. Secrets and the toolchain are never touched.
pub fn run(settings: &Settings, args: &RenderArgs) -> Result<()> {
    let identity = super::identity(args.namespace.as_deref(), &args.name);
    let controller = super::controller(settings);

    let Some(text) = controller.render(&identity)? else {
        bail!(
            "No resource '{}' under {}",
            identity,
            settings.resources_dir.display()
        );
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
