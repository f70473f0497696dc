//! Exit code constants for the statelock CLI.
//!
//! - 0: Success, including idempotent no-ops (lock already held by the caller,
//!   release of an absent lock)
//! - 1: Any failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any failure: lock conflict, ownership mismatch, declined confirmation,
/// store I/O, bad configuration.
pub const FAILURE: i32 = 1;
