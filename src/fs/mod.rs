//! Filesystem utilities for statelock.
//!
//! Atomic writes used both for the local copy of the state artifact and by
//! the filesystem object store.

pub mod atomic;

pub use atomic::{atomic_create, atomic_write};
