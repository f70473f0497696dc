//! Filesystem-backed object store.
//!
//! A bucket is a directory under the store root and a key is a `/`-separated
//! relative path inside it, so the store can live on a shared or
//! network-mounted filesystem that several machines see.
//!
//! Version tokens are the SHA-256 of the object content. Every mutation of a
//! key runs under an exclusive OS file lock (`fs2`) on a hidden sibling guard
//! file `.{name}.guard`, so a conditional delete reads, compares and removes
//! while no other writer can touch the key. Create-if-absent additionally
//! publishes with `hard_link`, which fails when the key already exists.
//!
//! Guard files are never removed; unlinking a locked file would let a later
//! writer lock a fresh inode while the old one is still held.

use super::{
    DeletePrecondition, DeleteResult, ObjectStore, StoredObject, WritePrecondition, WriteResult,
};
use crate::error::{LockError, Result};
use crate::fs::{atomic_create, atomic_write};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Object store rooted at `<store_root>/<bucket>/`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open the bucket directory under `store_root`.
    ///
    /// The directory is created lazily on first write.
    pub fn open<P: AsRef<Path>>(store_root: P, bucket: &str) -> Result<Self> {
        if bucket.is_empty()
            || bucket == "."
            || bucket == ".."
            || bucket.contains(['/', '\\'])
        {
            return Err(LockError::UserError(format!(
                "invalid bucket name '{}': must be a single non-empty path segment",
                bucket
            )));
        }

        Ok(Self {
            root: store_root.as_ref().join(bucket),
        })
    }

    /// Directory holding this bucket's objects.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, part| path.join(part)))
    }
}

/// Reject keys that would escape the bucket or alias another key.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");

    if invalid {
        return Err(LockError::UserError(format!(
            "invalid object key '{}': expected a relative path like 'locks/state.lock'",
            key
        )));
    }
    Ok(())
}

fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn store_error(action: &str, path: &Path, e: io::Error) -> LockError {
    LockError::Store(format!("failed to {} '{}': {}", action, path.display(), e))
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(store_error("read", path, e)),
    }
}

fn guard_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        LockError::Store(format!("invalid object path '{}'", path.display()))
    })?;
    Ok(path.with_file_name(format!(".{}.guard", name)))
}

/// Take the per-key writer lock, blocking until it is free.
///
/// The lock is released when the returned file is dropped.
fn lock_key(path: &Path) -> Result<File> {
    let guard = guard_path(path)?;
    if let Some(parent) = guard.parent() {
        fs::create_dir_all(parent).map_err(|e| store_error("create", parent, e))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&guard)
        .map_err(|e| store_error("open guard", &guard, e))?;
    FileExt::lock_exclusive(&file).map_err(|e| store_error("lock", &guard, e))?;
    Ok(file)
}

impl ObjectStore for FsStore {
    fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let path = self.object_path(key)?;
        let object = read_optional(&path)?.map(|data| StoredObject {
            version: digest(&data),
            data,
        });
        debug!(key, found = object.is_some(), "fs store get");
        Ok(object)
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let path = self.object_path(key)?;
        debug!(key, ?precondition, bytes = data.len(), "fs store put");

        let _guard = lock_key(&path)?;
        match precondition {
            WritePrecondition::None => {
                atomic_write(&path, data).map_err(|e| store_error("write", &path, e))?;
            }
            WritePrecondition::DoesNotExist => {
                let created =
                    atomic_create(&path, data).map_err(|e| store_error("create", &path, e))?;
                if !created {
                    let current_version = read_optional(&path)?
                        .map(|current| digest(&current))
                        .unwrap_or_default();
                    return Ok(WriteResult::PreconditionFailed { current_version });
                }
            }
        }

        Ok(WriteResult::Success {
            version: digest(data),
        })
    }

    fn delete(&self, key: &str, precondition: DeletePrecondition) -> Result<DeleteResult> {
        let path = self.object_path(key)?;
        debug!(key, ?precondition, "fs store delete");

        if path.parent().is_some_and(|parent| !parent.exists()) {
            return Ok(DeleteResult::NotFound);
        }
        let _guard = lock_key(&path)?;

        if let DeletePrecondition::MatchesVersion(expected) = precondition {
            let Some(data) = read_optional(&path)? else {
                return Ok(DeleteResult::NotFound);
            };
            let current_version = digest(&data);
            if current_version != expected {
                return Ok(DeleteResult::PreconditionFailed { current_version });
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => Ok(DeleteResult::Deleted),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DeleteResult::NotFound),
            Err(e) => Err(store_error("delete", &path, e)),
        }
    }

    fn supports_conditional_writes(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LockProtocol;
    use crate::record::{LockRecord, Provenance};
    use std::thread;
    use tempfile::TempDir;

    /// Entries in `dir` other than guard files.
    fn visible_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| !name.ends_with(".guard"))
            .collect()
    }

    fn open_store() -> (TempDir, FsStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::open(temp_dir.path(), "builds").unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let (_temp_dir, store) = open_store();
        assert_eq!(store.get("state.lock").unwrap(), None);
    }

    #[test]
    fn test_put_and_get_nested_key() {
        let (temp_dir, store) = open_store();
        store
            .put("locks/prod/state.lock", b"{}", WritePrecondition::None)
            .unwrap();

        let on_disk = temp_dir.path().join("builds/locks/prod/state.lock");
        assert_eq!(fs::read(on_disk).unwrap(), b"{}");

        let object = store.get("locks/prod/state.lock").unwrap().unwrap();
        assert_eq!(object.data, b"{}");
        assert_eq!(object.version, digest(b"{}"));
    }

    #[test]
    fn test_create_if_absent_blocks_second_writer() {
        let (_temp_dir, store) = open_store();

        let first = store
            .put("state.lock", b"first", WritePrecondition::DoesNotExist)
            .unwrap();
        assert!(matches!(first, WriteResult::Success { .. }));

        let second = store
            .put("state.lock", b"second", WritePrecondition::DoesNotExist)
            .unwrap();
        assert_eq!(
            second,
            WriteResult::PreconditionFailed {
                current_version: digest(b"first")
            }
        );
        assert_eq!(store.get("state.lock").unwrap().unwrap().data, b"first");
    }

    #[test]
    fn test_unconditional_put_overwrites() {
        let (_temp_dir, store) = open_store();
        store.put("k", b"first", WritePrecondition::None).unwrap();
        store.put("k", b"second", WritePrecondition::None).unwrap();
        assert_eq!(store.get("k").unwrap().unwrap().data, b"second");
    }

    #[test]
    fn test_conditional_delete_matching_version() {
        let (_temp_dir, store) = open_store();
        store.put("k", b"mine", WritePrecondition::None).unwrap();
        let version = store.get("k").unwrap().unwrap().version;

        let result = store
            .delete("k", DeletePrecondition::MatchesVersion(version))
            .unwrap();
        assert_eq!(result, DeleteResult::Deleted);
        assert_eq!(store.get("k").unwrap(), None);
        assert!(visible_entries(store.root()).is_empty());
    }

    #[test]
    fn test_conditional_delete_mismatch_restores_object() {
        let (_temp_dir, store) = open_store();
        store.put("k", b"theirs", WritePrecondition::None).unwrap();

        let result = store
            .delete("k", DeletePrecondition::MatchesVersion(digest(b"mine")))
            .unwrap();
        assert_eq!(
            result,
            DeleteResult::PreconditionFailed {
                current_version: digest(b"theirs")
            }
        );
        assert_eq!(store.get("k").unwrap().unwrap().data, b"theirs");
        assert_eq!(visible_entries(store.root()), vec!["k".to_string()]);
    }

    #[test]
    fn test_guard_file_sits_next_to_key() {
        let (_temp_dir, store) = open_store();
        store
            .put("locks/state.lock", b"x", WritePrecondition::DoesNotExist)
            .unwrap();
        assert!(store.root().join("locks/.state.lock.guard").exists());
    }

    #[test]
    fn test_delete_in_missing_directory_creates_nothing() {
        let (_temp_dir, store) = open_store();
        assert_eq!(
            store
                .delete("a/b/k", DeletePrecondition::MatchesVersion("x".to_string()))
                .unwrap(),
            DeleteResult::NotFound
        );
        assert!(!store.root().exists());
    }

    #[test]
    fn test_stale_delete_never_frees_held_lock() {
        let (_temp_dir, store) = open_store();
        let protocol = LockProtocol::new(&store, "state.lock");
        protocol
            .acquire(&LockRecord::new("holder", "1", Provenance::default()))
            .unwrap();
        let held = store.get("state.lock").unwrap().unwrap();

        let intruder_wins = thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..300 {
                    let result = store
                        .delete(
                            "state.lock",
                            DeletePrecondition::MatchesVersion("stale".to_string()),
                        )
                        .unwrap();
                    assert!(matches!(result, DeleteResult::PreconditionFailed { .. }));
                }
            });

            let intruder = LockRecord::new("intruder", "2", Provenance::default());
            let mut wins = 0;
            for _ in 0..300 {
                match protocol.acquire(&intruder) {
                    Err(LockError::Conflict { .. }) => {}
                    _ => wins += 1,
                }
            }
            wins
        });

        assert_eq!(intruder_wins, 0);
        assert_eq!(store.get("state.lock").unwrap().unwrap(), held);
        let leftovers: Vec<_> = visible_entries(store.root())
            .into_iter()
            .filter(|name| name != "state.lock")
            .collect();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }

    #[test]
    fn test_delete_missing_key() {
        let (_temp_dir, store) = open_store();
        assert_eq!(
            store.delete("k", DeletePrecondition::None).unwrap(),
            DeleteResult::NotFound
        );
        assert_eq!(
            store
                .delete("k", DeletePrecondition::MatchesVersion("x".to_string()))
                .unwrap(),
            DeleteResult::NotFound
        );
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let (_temp_dir, store) = open_store();
        for key in ["", "/etc/passwd", "../other/state.lock", "a//b", "a/./b", "a\\b"] {
            let err = store.get(key).unwrap_err();
            assert!(matches!(err, LockError::UserError(_)), "key {key:?}");
        }
    }

    #[test]
    fn test_rejects_invalid_bucket() {
        let temp_dir = TempDir::new().unwrap();
        for bucket in ["", "..", "a/b"] {
            assert!(FsStore::open(temp_dir.path(), bucket).is_err(), "bucket {bucket:?}");
        }
    }
}
