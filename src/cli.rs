use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "machineshop")]
#[command(author = "machineshop contributors")]
#[command(version)]
#[command(about = "Reconcile declarative infrastructure modules into applied Terraform workspaces", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: <config dir>/config.toml)
    #[arg(long, global = true, env = "MACHINESHOP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one reconciliation pass per resource
    Reconcile(ReconcileArgs),

    /// Print the rendered module call of a resource
    Render(RenderArgs),

    /// Manage cached Terraform binaries
    #[command(subcommand)]
    Toolchain(ToolchainCommand),

    /// Show recorded resource statuses
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconcile / Render
// ============================================================================

#[derive(Args)]
pub struct ReconcileArgs {
    /// Resource names
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Namespace of the resources
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Passes to run in parallel (default: from settings, else 1)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Resource name
    pub name: String,

    /// Namespace of the resource
    #[arg(short, long)]
    pub namespace: Option<String>,
}

// ============================================================================
// Toolchain
// ============================================================================

#[derive(Subcommand)]
pub enum ToolchainCommand {
    /// Download and cache an exact Terraform version
    Install {
        /// Version, e.g. 1.5.7
        #[arg(value_name = "VERSION")]
        tf_version: String,

        /// Reinstall even if cached
        #[arg(short, long)]
        force: bool,
    },

    /// List cached Terraform versions
    List,
}

// ============================================================================
// Status
// ============================================================================

#[derive(Args)]
pub struct StatusArgs {
    /// Resource name (default: all)
    pub name: Option<String>,

    /// Namespace of the resource
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}
