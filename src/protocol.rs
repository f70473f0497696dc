//! The lock protocol: acquire, check, release and force-release.
//!
//! The lock has two states. It is held exactly when an object exists at the
//! lock key, and the owner is the `lock_id` inside that object. Every
//! operation reads the key first and then attempts a single write or delete.
//!
//! When the store supports conditional operations the read-then-act gap is
//! closed: acquire creates with `DoesNotExist`, and release/force-release
//! delete with `MatchesVersion(<version read>)`. If the precondition fails the
//! key is re-read once to report what actually happened; nothing is retried.
//!
//! With conditional writes disabled (or unavailable) the same steps run
//! unconditionally. Two concurrent acquires can then both succeed and the
//! later write silently replaces the earlier owner.

use crate::confirm::Confirm;
use crate::error::{LockError, Result};
use crate::record::LockRecord;
use crate::store::{
    DeletePrecondition, DeleteResult, ObjectStore, StoredObject, WritePrecondition, WriteResult,
};
use tracing::{debug, info, warn};

/// Result of [`LockProtocol::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    Locked(LockRecord),
}

impl LockStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockStatus::Locked(_))
    }
}

/// Successful outcomes of [`LockProtocol::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The key was absent and now holds the candidate record.
    Acquired(LockRecord),
    /// The caller already owned the lock; the stored record is unchanged.
    AlreadyHeld(LockRecord),
}

/// Successful outcomes of [`LockProtocol::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller's lock was deleted.
    Released(LockRecord),
    /// There was no lock to release.
    NotHeld,
}

/// Lock operations against a single key of an object store.
pub struct LockProtocol<S> {
    store: S,
    key: String,
    conditional: bool,
}

impl<S: ObjectStore> LockProtocol<S> {
    /// Use conditional operations whenever `store` offers them.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        let conditional = store.supports_conditional_writes();
        Self {
            store,
            key: key.into(),
            conditional,
        }
    }

    /// Opt in or out of conditional operations.
    ///
    /// Enabling has no effect on a store without conditional primitives.
    pub fn with_conditional_writes(mut self, enabled: bool) -> Self {
        let supported = self.store.supports_conditional_writes();
        if enabled && !supported {
            warn!(
                key = %self.key,
                "store has no conditional writes; concurrent lock operations can overwrite each other"
            );
        }
        self.conditional = enabled && supported;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether writes and deletes carry preconditions.
    pub fn uses_conditional_writes(&self) -> bool {
        self.conditional
    }

    fn read_record(&self) -> Result<Option<(LockRecord, String)>> {
        match self.store.get(&self.key)? {
            Some(StoredObject { data, version }) => {
                Ok(Some((LockRecord::decode(&data)?, version)))
            }
            None => Ok(None),
        }
    }

    fn delete_precondition(&self, version: String) -> DeletePrecondition {
        if self.conditional {
            DeletePrecondition::MatchesVersion(version)
        } else {
            warn!(key = %self.key, "deleting lock without a version check");
            DeletePrecondition::None
        }
    }

    /// Read the lock without modifying it.
    pub fn check(&self) -> Result<LockStatus> {
        let status = match self.read_record()? {
            Some((record, _)) => LockStatus::Locked(record),
            None => LockStatus::Unlocked,
        };
        debug!(key = %self.key, locked = status.is_locked(), "checked lock");
        Ok(status)
    }

    /// Create the lock with `candidate` if the key is absent.
    ///
    /// Owning the lock already is a success ([`AcquireOutcome::AlreadyHeld`]);
    /// a lock owned by anyone else is [`LockError::Conflict`] and is never
    /// overwritten by this call. A failed read aborts before any write.
    pub fn acquire(&self, candidate: &LockRecord) -> Result<AcquireOutcome> {
        if let Some((existing, _)) = self.read_record()? {
            return self.classify_held(existing, candidate);
        }

        let precondition = if self.conditional {
            WritePrecondition::DoesNotExist
        } else {
            warn!(key = %self.key, "writing lock without a create-if-absent check");
            WritePrecondition::None
        };

        match self.store.put(&self.key, &candidate.encode()?, precondition)? {
            WriteResult::Success { version } => {
                info!(key = %self.key, owner = %candidate.owner_id, %version, "lock acquired");
                Ok(AcquireOutcome::Acquired(candidate.clone()))
            }
            WriteResult::PreconditionFailed { current_version } => {
                debug!(key = %self.key, %current_version, "lock created concurrently");
                match self.read_record()? {
                    Some((existing, _)) => self.classify_held(existing, candidate),
                    None => Err(LockError::Contended {
                        key: self.key.clone(),
                    }),
                }
            }
        }
    }

    fn classify_held(
        &self,
        existing: LockRecord,
        candidate: &LockRecord,
    ) -> Result<AcquireOutcome> {
        if existing.is_owned_by(&candidate.owner_id) {
            debug!(key = %self.key, owner = %existing.owner_id, "lock already held by caller");
            Ok(AcquireOutcome::AlreadyHeld(existing))
        } else {
            Err(LockError::Conflict {
                key: self.key.clone(),
                holder: existing.owner_id,
                since: existing.created_at,
            })
        }
    }

    /// Delete the lock if `caller_id` owns it.
    ///
    /// An absent lock is [`ReleaseOutcome::NotHeld`]. A lock owned by anyone
    /// else is [`LockError::OwnershipMismatch`] and stays in place.
    pub fn release(&self, caller_id: &str) -> Result<ReleaseOutcome> {
        let Some((existing, version)) = self.read_record()? else {
            info!(key = %self.key, "no lock to release");
            return Ok(ReleaseOutcome::NotHeld);
        };

        if !existing.is_owned_by(caller_id) {
            return Err(self.ownership_mismatch(existing, caller_id));
        }

        match self.store.delete(&self.key, self.delete_precondition(version))? {
            DeleteResult::Deleted => {
                info!(key = %self.key, owner = %caller_id, "lock released");
                Ok(ReleaseOutcome::Released(existing))
            }
            DeleteResult::NotFound => Ok(ReleaseOutcome::NotHeld),
            DeleteResult::PreconditionFailed { current_version } => {
                debug!(key = %self.key, %current_version, "lock replaced before delete");
                match self.read_record()? {
                    None => Ok(ReleaseOutcome::NotHeld),
                    Some((current, _)) if current.is_owned_by(caller_id) => {
                        Err(LockError::Contended {
                            key: self.key.clone(),
                        })
                    }
                    Some((current, _)) => Err(self.ownership_mismatch(current, caller_id)),
                }
            }
        }
    }

    fn ownership_mismatch(&self, holder: LockRecord, caller_id: &str) -> LockError {
        LockError::OwnershipMismatch {
            key: self.key.clone(),
            holder: holder.owner_id,
            caller: caller_id.to_string(),
        }
    }

    /// Delete the lock regardless of owner, after `gate` confirms.
    ///
    /// The gate runs only once the lock is known to exist and before anything
    /// is deleted. A lock whose content cannot be decoded can still be removed;
    /// the returned record is `None` in that case.
    pub fn force_release(&self, gate: &mut dyn Confirm) -> Result<Option<LockRecord>> {
        let Some(object) = self.store.get(&self.key)? else {
            return Err(LockError::NotLocked {
                key: self.key.clone(),
            });
        };

        let record = match LockRecord::decode(&object.data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %self.key, error = %e, "lock content is unreadable");
                None
            }
        };

        let warning = match &record {
            Some(held) => format!(
                "WARNING: this removes lock '{}' held by {} without checking ownership.\n\
                 Any operation running under that lock may be disrupted.",
                self.key, held
            ),
            None => format!(
                "WARNING: lock '{}' exists but its content is unreadable.\n\
                 Removing it cannot verify who holds it.",
                self.key
            ),
        };

        if !gate.confirm(&warning)? {
            info!(key = %self.key, "force release declined");
            return Err(LockError::ConfirmationDeclined);
        }

        match self
            .store
            .delete(&self.key, self.delete_precondition(object.version))?
        {
            DeleteResult::Deleted => {
                info!(key = %self.key, "lock force-released");
                Ok(record)
            }
            DeleteResult::NotFound | DeleteResult::PreconditionFailed { .. } => {
                Err(LockError::Contended {
                    key: self.key.clone(),
                })
            }
        }
    }
}
