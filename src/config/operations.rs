//! Config loading, discovery, overrides, and validation.

use super::model::Config;
use crate::error::{LockError, Result};
use crate::store::validate_key;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory and the home directory.
pub const CONFIG_FILE_NAME: &str = "statelock.yaml";

pub const ENV_STORE_ROOT: &str = "STATELOCK_STORE_ROOT";
pub const ENV_BUCKET: &str = "STATELOCK_BUCKET";
pub const ENV_LOCK_KEY: &str = "STATELOCK_LOCK_KEY";
pub const ENV_STATE_KEY: &str = "STATELOCK_STATE_KEY";

/// Values given on the command line. Each one beats file and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub store_root: Option<PathBuf>,
    pub bucket: Option<String>,
    pub lock_key: Option<String>,
    pub state_key: Option<String>,
    pub local_state_path: Option<PathBuf>,
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LockError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Find and load the config file.
    ///
    /// Lookup order: `explicit` (must exist), `./statelock.yaml`,
    /// `~/statelock.yaml`, built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            LockError::UserError(format!("failed to determine current directory: {}", e))
        })?;
        let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self::discover_in(explicit, &cwd, home.as_deref())
    }

    /// [`Config::discover`] with explicit search directories.
    pub fn discover_in(explicit: Option<&Path>, cwd: &Path, home: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidates = std::iter::once(cwd).chain(home);
        for dir in candidates {
            let path = dir.join(CONFIG_FILE_NAME);
            if path.is_file() {
                return Self::load(path);
            }
        }

        debug!("no config file found; using defaults");
        Ok(Self::default())
    }

    /// Apply `STATELOCK_*` environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply environment overrides read through `lookup`. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(root) = get(ENV_STORE_ROOT) {
            self.store_root = PathBuf::from(root);
        }
        if let Some(bucket) = get(ENV_BUCKET) {
            self.bucket = bucket;
        }
        if let Some(key) = get(ENV_LOCK_KEY) {
            self.lock_key = key;
        }
        if let Some(key) = get(ENV_STATE_KEY) {
            self.state_key = key;
        }
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(root) = &overrides.store_root {
            self.store_root = root.clone();
        }
        if let Some(bucket) = &overrides.bucket {
            self.bucket = bucket.clone();
        }
        if let Some(key) = &overrides.lock_key {
            self.lock_key = key.clone();
        }
        if let Some(key) = &overrides.state_key {
            self.state_key = key.clone();
        }
        if let Some(path) = &overrides.local_state_path {
            self.local_state_path = path.clone();
        }
    }

    /// Discover the config file, then layer environment and CLI overrides.
    pub fn resolve(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = Self::discover(explicit)?;
        config.apply_env();
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_key` and `state_key` must be relative object keys without `.`/`..` segments
    /// - `lock_key` and `state_key` must differ
    /// - `commit_env` and `pipeline_env` must be non-empty
    /// - `store_root` must be non-empty
    pub fn validate(&self) -> Result<()> {
        for (field, key) in [("lock_key", &self.lock_key), ("state_key", &self.state_key)] {
            validate_key(key).map_err(|e| {
                LockError::UserError(format!("config validation failed: {}: {}", field, e))
            })?;
        }

        if self.lock_key == self.state_key {
            return Err(LockError::UserError(format!(
                "config validation failed: lock_key and state_key must differ (both are '{}')",
                self.lock_key
            )));
        }

        for (field, name) in [
            ("commit_env", &self.commit_env),
            ("pipeline_env", &self.pipeline_env),
        ] {
            if name.trim().is_empty() {
                return Err(LockError::UserError(format!(
                    "config validation failed: {} must be non-empty",
                    field
                )));
            }
        }

        if self.store_root.as_os_str().is_empty() {
            return Err(LockError::UserError(
                "config validation failed: store_root must be non-empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured bucket, or a user error naming every way to set it.
    pub fn require_bucket(&self) -> Result<&str> {
        if self.bucket.trim().is_empty() {
            return Err(LockError::UserError(format!(
                "no bucket configured. Pass --bucket, set {}, or add `bucket:` to {}",
                ENV_BUCKET, CONFIG_FILE_NAME
            )));
        }
        Ok(&self.bucket)
    }
}
