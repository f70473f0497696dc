//! Command implementations for statelock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations in the `lock` module.

mod lock;

use crate::cli::{Command, LockAction, LockCommand};
use crate::config::{Config, ConfigOverrides};
use crate::confirm::PromptConfirm;
use crate::error::Result;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// `config_path` is the optional `--config` value; it is resolved together
/// with the command's own overrides.
pub fn dispatch(command: Command, config_path: Option<&Path>) -> Result<()> {
    match command {
        Command::Lock(lock_cmd) => dispatch_lock(lock_cmd, config_path),
    }
}

fn load_config(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
    Config::resolve(config_path, overrides)
}

/// Dispatch lock subcommands.
fn dispatch_lock(lock_cmd: LockCommand, config_path: Option<&Path>) -> Result<()> {
    match lock_cmd.action {
        LockAction::Acquire(args) => {
            let config = load_config(config_path, &args.overrides())?;
            let protocol = lock::open_protocol(&config)?;
            let identity = lock::resolve_identity(&config)?;
            lock::cmd_acquire(&protocol, &identity).map(drop)
        }
        LockAction::Release(args) => {
            let config = load_config(config_path, &args.overrides())?;
            let protocol = lock::open_protocol(&config)?;
            let identity = lock::resolve_identity(&config)?;
            lock::cmd_release(&protocol, &identity).map(drop)
        }
        LockAction::ForceRelease(args) => {
            let config = load_config(config_path, &args.overrides())?;
            let protocol = lock::open_protocol(&config)?;
            lock::cmd_force_release(&protocol, &mut PromptConfirm::stdio()).map(drop)
        }
        LockAction::Status(args) => {
            let config = load_config(config_path, &args.overrides())?;
            let protocol = lock::open_protocol(&config)?;
            lock::cmd_status(&protocol).map(drop)
        }
        LockAction::Refresh(args) => {
            let config = load_config(config_path, &args.overrides())?;
            let protocol = lock::open_protocol(&config)?;
            let identity = lock::resolve_identity(&config)?;
            lock::cmd_refresh(
                &protocol,
                &identity,
                &config.state_key,
                &config.local_state_path,
            )
            .map(drop)
        }
        LockAction::Sync(args) => {
            let config = load_config(config_path, &args.overrides())?;
            let protocol = lock::open_protocol(&config)?;
            let identity = lock::resolve_identity(&config)?;
            lock::cmd_sync(
                &protocol,
                &identity,
                &config.state_key,
                &config.local_state_path,
            )
            .map(drop)
        }
    }
}
