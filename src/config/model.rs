//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for statelock.
///
/// This struct represents the contents of `statelock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Store settings
    // =========================================================================
    /// Root directory of the object store; each bucket is a sub-directory.
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,

    /// Bucket holding the lock and the state artifact. Required at command time.
    #[serde(default)]
    pub bucket: String,

    /// Key of the lock object inside the bucket.
    #[serde(default = "default_lock_key")]
    pub lock_key: String,

    /// Whether lock writes and deletes use preconditions.
    ///
    /// Turning this off reproduces last-write-wins behaviour, where two
    /// concurrent acquires can both succeed.
    #[serde(default = "default_true")]
    pub conditional_writes: bool,

    // =========================================================================
    // State settings
    // =========================================================================
    /// Key of the shared state artifact inside the bucket.
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// Local path of the state artifact.
    #[serde(default = "default_local_state_path")]
    pub local_state_path: PathBuf,

    // =========================================================================
    // Identity settings
    // =========================================================================
    /// Environment variable carrying the build commit id.
    #[serde(default = "default_commit_env")]
    pub commit_env: String,

    /// Environment variable carrying the pipeline run id.
    #[serde(default = "default_pipeline_env")]
    pub pipeline_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            bucket: String::new(),
            lock_key: default_lock_key(),
            conditional_writes: default_true(),
            state_key: default_state_key(),
            local_state_path: default_local_state_path(),
            commit_env: default_commit_env(),
            pipeline_env: default_pipeline_env(),
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".statelock")
}

fn default_lock_key() -> String {
    "state.lock".to_string()
}

fn default_state_key() -> String {
    "manifest.json".to_string()
}

fn default_local_state_path() -> PathBuf {
    PathBuf::from("target/manifest.json")
}

fn default_commit_env() -> String {
    "CI_COMMIT_SHA".to_string()
}

fn default_pipeline_env() -> String {
    "CI_PIPELINE_IID".to_string()
}

fn default_true() -> bool {
    true
}
