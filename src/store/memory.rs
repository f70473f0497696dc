//! In-memory object store.
//!
//! Thread-safe via `RwLock`. Versions are a per-store counter exposed as
//! strings. Used as the test double for the lock protocol.

use super::{
    DeletePrecondition, DeleteResult, ObjectStore, StoredObject, WritePrecondition, WriteResult,
};
use crate::error::{LockError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, (Vec<u8>, u64)>,
    next_version: u64,
}

/// In-memory store, optionally ignoring preconditions.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    conditional: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store that enforces write and delete preconditions atomically.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            conditional: true,
        }
    }

    /// A store with no conditional primitives: every precondition is ignored
    /// and the last write wins.
    pub fn last_write_wins() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            conditional: false,
        }
    }

    /// Raw bytes at `key`, bypassing the trait.
    #[cfg(test)]
    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.objects.get(key).map(|(data, _)| data.clone()))
    }
}

fn poisoned() -> LockError {
    LockError::Store("memory store lock poisoned".to_string())
}

impl ObjectStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.objects.get(key).map(|(data, version)| StoredObject {
            data: data.clone(),
            version: version.to_string(),
        }))
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        if self.conditional
            && precondition == WritePrecondition::DoesNotExist
            && let Some((_, version)) = inner.objects.get(key)
        {
            return Ok(WriteResult::PreconditionFailed {
                current_version: version.to_string(),
            });
        }

        inner.next_version += 1;
        let version = inner.next_version;
        inner.objects.insert(key.to_string(), (data.to_vec(), version));

        Ok(WriteResult::Success {
            version: version.to_string(),
        })
    }

    fn delete(&self, key: &str, precondition: DeletePrecondition) -> Result<DeleteResult> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;

        let Some((_, current)) = inner.objects.get(key) else {
            return Ok(DeleteResult::NotFound);
        };

        if self.conditional
            && let DeletePrecondition::MatchesVersion(expected) = &precondition
            && *expected != current.to_string()
        {
            return Ok(DeleteResult::PreconditionFailed {
                current_version: current.to_string(),
            });
        }

        inner.objects.remove(key);
        Ok(DeleteResult::Deleted)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.conditional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn put_then_get_returns_data_and_version() {
        let store = MemoryStore::new();
        let result = store.put("k", b"hello", WritePrecondition::None).unwrap();
        let WriteResult::Success { version } = result else {
            panic!("expected success");
        };

        let object = store.get("k").unwrap().unwrap();
        assert_eq!(object.data, b"hello");
        assert_eq!(object.version, version);
    }

    #[test]
    fn does_not_exist_precondition_blocks_second_create() {
        let store = MemoryStore::new();
        store.put("k", b"first", WritePrecondition::DoesNotExist).unwrap();

        let result = store.put("k", b"second", WritePrecondition::DoesNotExist).unwrap();
        assert!(matches!(result, WriteResult::PreconditionFailed { .. }));
        assert_eq!(store.contents("k").unwrap(), b"first");
    }

    #[test]
    fn last_write_wins_ignores_does_not_exist() {
        let store = MemoryStore::last_write_wins();
        store.put("k", b"first", WritePrecondition::DoesNotExist).unwrap();

        let result = store.put("k", b"second", WritePrecondition::DoesNotExist).unwrap();
        assert!(matches!(result, WriteResult::Success { .. }));
        assert_eq!(store.contents("k").unwrap(), b"second");
        assert!(!store.supports_conditional_writes());
    }

    #[test]
    fn versions_change_on_every_write() {
        let store = MemoryStore::new();
        store.put("k", b"a", WritePrecondition::None).unwrap();
        let v1 = store.get("k").unwrap().unwrap().version;
        store.put("k", b"a", WritePrecondition::None).unwrap();
        let v2 = store.get("k").unwrap().unwrap().version;
        assert_ne!(v1, v2);
    }

    #[test]
    fn delete_with_matching_version() {
        let store = MemoryStore::new();
        store.put("k", b"a", WritePrecondition::None).unwrap();
        let version = store.get("k").unwrap().unwrap().version;

        let result = store
            .delete("k", DeletePrecondition::MatchesVersion(version))
            .unwrap();
        assert_eq!(result, DeleteResult::Deleted);
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn delete_with_stale_version_keeps_object() {
        let store = MemoryStore::new();
        store.put("k", b"a", WritePrecondition::None).unwrap();
        let stale = store.get("k").unwrap().unwrap().version;
        store.put("k", b"b", WritePrecondition::None).unwrap();

        let result = store.delete("k", DeletePrecondition::MatchesVersion(stale)).unwrap();
        assert!(matches!(result, DeleteResult::PreconditionFailed { .. }));
        assert_eq!(store.contents("k").unwrap(), b"b");
    }

    #[test]
    fn delete_missing_key_reports_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.delete("k", DeletePrecondition::None).unwrap(),
            DeleteResult::NotFound
        );
    }
}
