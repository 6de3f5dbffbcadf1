use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the target configuration.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter configuration file.
    Init,
    /// Reconcile targets against their remote sources.
    Sync(SyncArgs),
    /// Show what sync would do for each target, without touching remotes.
    Status(StatusArgs),
    /// Pull latest into a git working copy, preserving uncommitted edits.
    Pull(PullArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Targets to reconcile; all configured targets when empty.
    pub names: Vec<String>,

    /// Keep reconciling remaining targets when one fails.
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    pub name: Option<String>,
}

#[derive(Args)]
pub struct PullArgs {
    /// Working copy to pull into.
    pub path: PathBuf,
}
