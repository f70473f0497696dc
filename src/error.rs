//! Error types for the statelock CLI.
//!
//! Uses thiserror for derive macros. Every variant is a distinct, inspectable
//! outcome; none of them are swallowed on the way to the CLI boundary.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for statelock operations.
///
/// An idempotent re-acquire is not represented here: it is
/// [`AcquireOutcome::AlreadyHeld`](crate::protocol::AcquireOutcome::AlreadyHeld).
/// A missing key is `Ok(None)` from the store, never an error.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock is held by a different owner (acquire path).
    #[error(
        "lock '{key}' is held by {holder} (since {since}).\n\
         Wait for the holder to release it, or use `statelock lock force-release`."
    )]
    Conflict {
        key: String,
        holder: String,
        since: String,
    },

    /// Release attempted by an identity that does not own the lock.
    #[error(
        "lock '{key}' is owned by {holder}, not by {caller}.\n\
         Only the owner can release it; use `statelock lock force-release` to remove it anyway."
    )]
    OwnershipMismatch {
        key: String,
        holder: String,
        caller: String,
    },

    /// The operation needs an existing lock and there is none.
    #[error("lock '{key}' does not exist. Nothing to release.")]
    NotLocked { key: String },

    /// Force release aborted at the confirmation prompt.
    #[error("force release cancelled; the remote lock was not modified")]
    ConfirmationDeclined,

    /// The lock changed between the read and the conditional write/delete.
    #[error("lock '{key}' changed while the operation was in progress; check its state and retry")]
    Contended { key: String },

    /// Transport or storage failure unrelated to lock semantics.
    #[error("store operation failed: {0}")]
    Store(String),

    /// A lock record could not be encoded or decoded.
    #[error("invalid lock record: {0}")]
    Codec(String),

    /// Git subprocess failed.
    #[error("git operation failed: {0}")]
    Git(String),

    /// Invalid arguments, configuration, or local state.
    #[error("{0}")]
    UserError(String),
}

impl LockError {
    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        exit_codes::FAILURE
    }

    /// Only transport-level failures are worth retrying by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LockError::Store(_))
    }
}

/// Result type alias for statelock operations.
pub type Result<T> = std::result::Result<T, LockError>;
