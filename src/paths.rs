//! Centralized path resolution for machineshop
//!
//! # Environment Variables
//!
//! - `MACHINESHOP_CONFIG_DIR` - Override config directory
//! - `MACHINESHOP_STATE_DIR` - Override state directory (statuses, logs)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `MACHINESHOP_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/machineshop` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\machineshop`
//!    - macOS/Linux: `~/.config/machineshop`
//!
//! For state_dir():
//! 1. `MACHINESHOP_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/machineshop` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\machineshop`
//!    - macOS/Linux: `~/.local/state/machineshop`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "MACHINESHOP_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "MACHINESHOP_STATE_DIR";

const APP: &str = "machineshop";

/// Get the machineshop config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(|key| std::env::var(key).ok())
}

/// Get the machineshop state directory path
pub fn state_dir() -> Result<PathBuf> {
    state_dir_with(|key| std::env::var(key).ok())
}

fn config_dir_with(var: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = var(ENV_CONFIG_DIR).filter(|d| !d.is_empty()) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Some(xdg_config) = var("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        let path = PathBuf::from(xdg_config).join(APP);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Platform default
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

fn state_dir_with(var: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = var(ENV_STATE_DIR).filter(|d| !d.is_empty()) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Some(xdg_state) = var("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
        let path = PathBuf::from(xdg_state).join(APP);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
