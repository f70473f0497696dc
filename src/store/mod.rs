//! Object store abstraction used by the lock protocol.
//!
//! The contract is deliberately small: read a key, write a key, delete a key.
//! Absence of a key is a normal `Ok(None)` outcome, distinct from I/O failures.
//!
//! Writes and deletes accept a precondition so that stores offering
//! conditional operations can make create-if-absent and delete-if-unchanged
//! atomic. A failed precondition is reported as a result value, never as an
//! error. Version tokens are opaque strings whose meaning is backend-specific.

mod filesystem;
#[cfg(test)]
mod memory;

pub use filesystem::FsStore;
pub(crate) use filesystem::validate_key;
#[cfg(test)]
pub use memory::MemoryStore;

use crate::error::Result;

/// Precondition for writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Write unconditionally (last write wins).
    None,
    /// Write only if no object exists at the key.
    DoesNotExist,
}

/// Precondition for deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePrecondition {
    /// Delete unconditionally.
    None,
    /// Delete only if the object's version still matches the given token.
    MatchesVersion(String),
}

/// Result of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Write succeeded; returns the new version token.
    Success { version: String },
    /// Precondition failed; returns the version that caused it to fail.
    PreconditionFailed { current_version: String },
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteResult {
    /// The object was removed.
    Deleted,
    /// There was nothing at the key.
    NotFound,
    /// Precondition failed; the object was left in place.
    PreconditionFailed { current_version: String },
}

/// An object read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    /// Opaque version token for conditional deletes.
    pub version: String,
}

/// Minimal capability surface over a path-addressed object store.
///
/// Implementations perform a single attempt per call; retries, if any, belong
/// to the caller.
pub trait ObjectStore {
    /// Read the object at `key`; `Ok(None)` if it does not exist.
    fn get(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Write `data` at `key` subject to `precondition`.
    fn put(&self, key: &str, data: &[u8], precondition: WritePrecondition)
    -> Result<WriteResult>;

    /// Delete the object at `key` subject to `precondition`.
    fn delete(&self, key: &str, precondition: DeletePrecondition) -> Result<DeleteResult>;

    /// Whether preconditions are enforced atomically by this store.
    ///
    /// Stores returning `false` treat every precondition as `None`.
    fn supports_conditional_writes(&self) -> bool;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        (**self).put(key, data, precondition)
    }

    fn delete(&self, key: &str, precondition: DeletePrecondition) -> Result<DeleteResult> {
        (**self).delete(key, precondition)
    }

    fn supports_conditional_writes(&self) -> bool {
        (**self).supports_conditional_writes()
    }
}
