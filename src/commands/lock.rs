//! Implementation of the `statelock lock` subcommands.
//!
//! Each handler takes an already-built [`LockProtocol`] so it can run against
//! any [`ObjectStore`]; `open_protocol` builds the filesystem-backed one used
//! by the binary.

use crate::config::Config;
use crate::confirm::Confirm;
use crate::error::{LockError, Result};
use crate::identity::{CallerIdentity, IdentityInputs};
use crate::protocol::{AcquireOutcome, LockProtocol, LockStatus, ReleaseOutcome};
use crate::record::LockRecord;
use crate::state::{self, RefreshOutcome};
use crate::store::{FsStore, ObjectStore};
use std::path::Path;

/// Build the protocol for the configured bucket and lock key.
pub fn open_protocol(config: &Config) -> Result<LockProtocol<FsStore>> {
    let store = FsStore::open(&config.store_root, config.require_bucket()?)?;
    Ok(LockProtocol::new(store, config.lock_key.clone())
        .with_conditional_writes(config.conditional_writes))
}

/// Resolve the caller identity from the environment and working directory.
pub fn resolve_identity(config: &Config) -> Result<CallerIdentity> {
    let cwd = std::env::current_dir().map_err(|e| {
        LockError::UserError(format!("failed to determine current directory: {}", e))
    })?;
    let identity = CallerIdentity::resolve(&IdentityInputs::from_env(config, &cwd));
    for warning in identity.warnings() {
        eprintln!("Warning: {}", warning);
    }
    Ok(identity)
}

fn print_record(record: &LockRecord) {
    println!("  Owner:      {}", record.owner_id);
    println!("  Signer:     {}", record.signer);
    println!("  Created:    {}", record.created_at);
    println!("  Age:        {}", record.age_string());
    let provenance = &record.provenance;
    if !provenance.commit_source.is_empty() {
        println!("  Commit:     {}", provenance.commit_source);
    }
    if !provenance.trigger_source.is_empty() {
        println!("  Trigger:    {}", provenance.trigger_source);
    }
    if !provenance.note.is_empty() {
        println!("  Note:       {}", provenance.note);
    }
}

pub fn cmd_acquire<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    identity: &CallerIdentity,
) -> Result<AcquireOutcome> {
    let outcome = protocol.acquire(&identity.lock_record())?;
    match &outcome {
        AcquireOutcome::Acquired(record) => {
            println!("Acquired lock: {}", protocol.key());
            println!();
            print_record(record);
        }
        AcquireOutcome::AlreadyHeld(record) => {
            println!(
                "Lock already acquired: {} is held by {} since {}. Nothing to do.",
                protocol.key(),
                record.owner_id,
                record.created_at
            );
        }
    }
    Ok(outcome)
}

pub fn cmd_release<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    identity: &CallerIdentity,
) -> Result<ReleaseOutcome> {
    let outcome = protocol.release(&identity.owner.value)?;
    match &outcome {
        ReleaseOutcome::Released(record) => {
            println!("Released lock: {}", protocol.key());
            println!("  Owner:      {}", record.owner_id);
            println!("  Held for:   {}", record.age_string());
        }
        ReleaseOutcome::NotHeld => {
            println!("No lock at {}. Nothing to release.", protocol.key());
        }
    }
    Ok(outcome)
}

pub fn cmd_force_release<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    gate: &mut dyn Confirm,
) -> Result<Option<LockRecord>> {
    let removed = protocol.force_release(gate)?;
    println!("Force-released lock: {}", protocol.key());
    match &removed {
        Some(record) => {
            println!();
            println!("Lock details:");
            print_record(record);
        }
        None => println!("  (lock content was unreadable)"),
    }
    Ok(removed)
}

pub fn cmd_status<S: ObjectStore>(protocol: &LockProtocol<S>) -> Result<LockStatus> {
    let status = protocol.check()?;
    match &status {
        LockStatus::Unlocked => println!("Lock {} is not held.", protocol.key()),
        LockStatus::Locked(record) => {
            println!("Lock {} is held:", protocol.key());
            print_record(record);
        }
    }
    if !protocol.uses_conditional_writes() {
        println!();
        println!("Note: conditional writes are off; concurrent acquires can overwrite each other.");
    }
    Ok(status)
}

pub fn cmd_refresh<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    identity: &CallerIdentity,
    state_key: &str,
    local_path: &Path,
) -> Result<RefreshOutcome> {
    let outcome = state::refresh(protocol, &identity.owner.value, state_key, local_path)?;
    match outcome {
        RefreshOutcome::UpToDate => {
            println!("Local state is current: the lock is held by this commit.");
        }
        RefreshOutcome::Refreshed { bytes } => {
            println!(
                "Refreshed local state: {} -> {} ({} bytes)",
                state_key,
                local_path.display(),
                bytes
            );
        }
    }
    Ok(outcome)
}

pub fn cmd_sync<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    identity: &CallerIdentity,
    state_key: &str,
    local_path: &Path,
) -> Result<usize> {
    let bytes = state::sync(protocol, &identity.owner.value, state_key, local_path)?;
    println!(
        "Synced state: {} -> {} ({} bytes)",
        local_path.display(),
        state_key,
        bytes
    );
    Ok(bytes)
}
