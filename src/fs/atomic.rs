//! Atomic filesystem operations.
//!
//! All writes follow the same pattern:
//! 1. Write content to a uniquely named temporary file in the target directory
//! 2. Sync the file to disk (fsync)
//! 3. Publish it at the target path with a single atomic filesystem call
//!
//! `atomic_write` publishes with `rename()`, replacing any existing file.
//! `atomic_create` publishes with `hard_link()`, which fails if the target
//! already exists, so exactly one of several concurrent creators wins and
//! readers never observe a partially written file.
//!
//! Source and destination must be on the same filesystem. On crash, a
//! temporary file named `.{filename}.{uuid}.tmp` may remain.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Atomically write bytes to a file, replacing it if it exists.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = sibling_path(path, "tmp")?;
    write_and_sync(&temp_path, content)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    sync_parent(path);
    Ok(())
}

/// Atomically create a file with the given content.
///
/// Returns `Ok(false)` without touching the existing file if `path` already
/// exists.
pub fn atomic_create<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<bool> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = sibling_path(path, "tmp")?;
    write_and_sync(&temp_path, content)?;

    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);

    match linked {
        Ok(()) => {
            sync_parent(path);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// A uniquely named hidden path next to `target`: `.{filename}.{uuid}.{suffix}`.
pub fn sibling_path(target: &Path, suffix: &str) -> io::Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid file path '{}'", target.display()),
            )
        })?;

    Ok(parent.join(format!(".{}.{}.{}", filename, Uuid::new_v4().simple(), suffix)))
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_and_sync(path: &Path, content: &[u8]) -> io::Result<()> {
    let result = File::create(path).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });

    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn sync_parent(path: &Path) {
    // Persist the directory entry; best effort, not supported everywhere.
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}
