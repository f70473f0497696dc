//! CLI argument parsing for statelock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Statelock: coordinate exclusive access to a shared build state artifact.
///
/// A lock is a single object in a shared store. Its presence means "locked";
/// its content records which commit and pipeline hold it.
#[derive(Parser, Debug)]
#[command(name = "statelock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file (default: ./statelock.yaml, then ~/statelock.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for statelock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lock management commands.
    ///
    /// Acquire, inspect, and release the remote state lock, and move the
    /// state artifact while holding it.
    Lock(LockCommand),
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Acquire the lock for the current commit.
    ///
    /// Succeeds without changes if this commit already holds it.
    Acquire(TargetArgs),

    /// Release the lock held by the current commit.
    Release(TargetArgs),

    /// Remove the lock regardless of owner.
    ///
    /// Asks for interactive confirmation first.
    ForceRelease(TargetArgs),

    /// Show who holds the lock.
    Status(TargetArgs),

    /// Download the remote state unless this commit holds the lock.
    Refresh(StateArgs),

    /// Upload the local state. Requires holding the lock.
    Sync(StateArgs),
}

/// Which lock to operate on.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Bucket holding the lock.
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Key of the lock object inside the bucket.
    #[arg(short, long)]
    pub key: Option<String>,

    /// Root directory of the object store.
    #[arg(long, value_name = "DIR")]
    pub store_root: Option<PathBuf>,
}

impl TargetArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            store_root: self.store_root.clone(),
            bucket: self.bucket.clone(),
            lock_key: self.key.clone(),
            ..Default::default()
        }
    }
}

/// Lock target plus the state artifact locations.
#[derive(Args, Debug, Clone, Default)]
pub struct StateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Key of the state artifact inside the bucket.
    #[arg(long)]
    pub state_key: Option<String>,

    /// Local path of the state artifact.
    #[arg(long, value_name = "PATH")]
    pub local: Option<PathBuf>,
}

impl StateArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            state_key: self.state_key.clone(),
            local_state_path: self.local.clone(),
            ..self.target.overrides()
        }
    }
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
