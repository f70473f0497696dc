//! Moving the shared state artifact between the store and the local disk.
//!
//! The lock record's owner is the revision that last produced the remote
//! state, so comparing it with the caller's owner identity tells whether the
//! local copy is current.

use crate::error::{LockError, Result};
use crate::fs::atomic_write;
use crate::protocol::{LockProtocol, LockStatus};
use crate::store::{ObjectStore, WritePrecondition, WriteResult};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Result of [`refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The caller owns the lock, so its local state is the latest.
    UpToDate,
    /// The remote state was downloaded to the local path.
    Refreshed { bytes: usize },
}

/// Pull the remote state into `local_path` unless the caller already owns it.
pub fn refresh<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    owner_id: &str,
    state_key: &str,
    local_path: &Path,
) -> Result<RefreshOutcome> {
    if let LockStatus::Locked(record) = protocol.check()?
        && record.is_owned_by(owner_id)
    {
        debug!(owner = %owner_id, "local state matches lock owner");
        return Ok(RefreshOutcome::UpToDate);
    }

    let object = protocol.store().get(state_key)?.ok_or_else(|| {
        LockError::UserError(format!(
            "remote state '{}' does not exist; run `statelock lock sync` from the lock holder first",
            state_key
        ))
    })?;

    atomic_write(local_path, &object.data).map_err(|e| local_error("write", local_path, e))?;
    info!(
        state_key,
        path = %local_path.display(),
        bytes = object.data.len(),
        "refreshed local state"
    );

    Ok(RefreshOutcome::Refreshed {
        bytes: object.data.len(),
    })
}

/// Upload `local_path` to `state_key`. The caller must hold the lock.
///
/// Returns the number of bytes uploaded.
pub fn sync<S: ObjectStore>(
    protocol: &LockProtocol<S>,
    owner_id: &str,
    state_key: &str,
    local_path: &Path,
) -> Result<usize> {
    match protocol.check()? {
        LockStatus::Unlocked => {
            return Err(LockError::NotLocked {
                key: protocol.key().to_string(),
            });
        }
        LockStatus::Locked(record) if !record.is_owned_by(owner_id) => {
            return Err(LockError::OwnershipMismatch {
                key: protocol.key().to_string(),
                holder: record.owner_id,
                caller: owner_id.to_string(),
            });
        }
        LockStatus::Locked(_) => {}
    }

    let data = fs::read(local_path).map_err(|e| local_error("read", local_path, e))?;

    match protocol
        .store()
        .put(state_key, &data, WritePrecondition::None)?
    {
        WriteResult::Success { version } => {
            info!(state_key, %version, bytes = data.len(), "synced state");
            Ok(data.len())
        }
        WriteResult::PreconditionFailed { current_version } => Err(LockError::Store(format!(
            "unconditional write to '{}' was rejected (current version {})",
            state_key, current_version
        ))),
    }
}

fn local_error(action: &str, path: &Path, e: io::Error) -> LockError {
    LockError::UserError(format!(
        "failed to {} local state '{}': {}",
        action,
        path.display(),
        e
    ))
}
