//! Configuration model for statelock.
//!
//! This module defines the Config struct that represents `statelock.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, environment and command-line
//! overrides, and validation of config values.

mod model;
mod operations;


// Re-export public API
pub use model::Config;
pub use operations::{
    CONFIG_FILE_NAME, ConfigOverrides, ENV_BUCKET, ENV_LOCK_KEY, ENV_STATE_KEY, ENV_STORE_ROOT,
};
