//! Caller identity resolution.
//!
//! A lock is owned by an identity token, normally the commit being built.
//! Each identity is resolved through a three-tier fallback:
//!
//! | Tier | Owner                      | Signer                      |
//! |------|----------------------------|-----------------------------|
//! | 1    | CI commit id (env)         | CI pipeline id (env)        |
//! | 2    | `git rev-parse HEAD`       | local `user@host`           |
//! | 3    | random UUID                | random UUID                 |
//!
//! Anything below tier 1 carries a non-`ok` provenance note so callers can
//! warn that the identity is approximate. Release re-derives the owner the
//! same way acquire did; an owner from tier 3 therefore cannot be released
//! by a later invocation, only force-released.

use crate::config::Config;
use crate::git;
use crate::record::{LockRecord, Provenance};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Provenance note for an identity taken verbatim from CI.
pub const SOURCE_OK: &str = "ok";

const NOTE_COMMIT_FROM_GIT: &str = "no CI commit id available, using local git revision";
const NOTE_COMMIT_RANDOM: &str = "no commit id available, using random token";
const NOTE_SIGNER_FROM_HOST: &str = "no pipeline id available, using local user@host";
const NOTE_SIGNER_RANDOM: &str = "no pipeline id available, using random token";
const NOTE_APPROXIMATE: &str = "WARNING: one or more CI identifiers were not found; \
     use the timestamp to correlate this lock with the exact commit and pipeline";

/// Which fallback tier produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Supplied by the CI environment.
    Environment,
    /// Derived from the local machine (git revision or `user@host`).
    Local,
    /// Freshly generated random token.
    Generated,
}

/// An identity value plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub value: String,
    pub source: IdentitySource,
    /// `ok` for [`IdentitySource::Environment`], otherwise a human-readable warning.
    pub note: String,
}

impl ResolvedIdentity {
    fn new(value: String, source: IdentitySource, note: &str) -> Self {
        Self {
            value,
            source,
            note: note.to_string(),
        }
    }

    /// True when the identity came from CI rather than a fallback.
    pub fn is_exact(&self) -> bool {
        self.source == IdentitySource::Environment
    }
}

/// Raw inputs for identity resolution, captured once per invocation.
#[derive(Debug, Clone, Default)]
pub struct IdentityInputs {
    /// Externally supplied build commit id.
    pub commit_id: Option<String>,
    /// Externally supplied pipeline run id.
    pub pipeline_id: Option<String>,
    /// Directory in which to ask git for HEAD.
    pub repo_dir: PathBuf,
    /// Local `user@host`, if it could be determined.
    pub local_user: Option<String>,
}

impl IdentityInputs {
    /// Capture inputs from the process environment, using the variable names
    /// configured in `config`.
    pub fn from_env(config: &Config, repo_dir: &Path) -> Self {
        Self {
            commit_id: std::env::var(&config.commit_env).ok(),
            pipeline_id: std::env::var(&config.pipeline_env).ok(),
            repo_dir: repo_dir.to_path_buf(),
            local_user: local_user(),
        }
    }
}

/// Both identities of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub owner: ResolvedIdentity,
    pub signer: ResolvedIdentity,
}

impl CallerIdentity {
    /// Resolve owner and signer independently.
    pub fn resolve(inputs: &IdentityInputs) -> Self {
        let identity = Self {
            owner: resolve_owner(inputs),
            signer: resolve_signer(inputs),
        };
        if !identity.is_exact() {
            debug!(
                owner_source = ?identity.owner.source,
                signer_source = ?identity.signer.source,
                "caller identity is approximate"
            );
        }
        identity
    }

    /// True when both identities came from CI.
    pub fn is_exact(&self) -> bool {
        self.owner.is_exact() && self.signer.is_exact()
    }

    /// Warnings to show the user, one per fallback in use.
    pub fn warnings(&self) -> Vec<&str> {
        [&self.owner, &self.signer]
            .into_iter()
            .filter(|id| !id.is_exact())
            .map(|id| id.note.as_str())
            .collect()
    }

    /// Combined provenance block for a lock record.
    pub fn provenance(&self) -> Provenance {
        Provenance {
            commit_source: self.owner.note.clone(),
            trigger_source: self.signer.note.clone(),
            note: if self.is_exact() {
                String::new()
            } else {
                NOTE_APPROXIMATE.to_string()
            },
        }
    }

    /// A fresh lock record claiming ownership for this caller.
    pub fn lock_record(&self) -> LockRecord {
        LockRecord::new(&self.owner.value, &self.signer.value, self.provenance())
    }
}

/// The value as supplied, unless it is missing or only whitespace.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn random_token() -> String {
    Uuid::new_v4().to_string()
}

/// Resolve the owner identity: CI commit id, else HEAD revision, else random.
pub fn resolve_owner(inputs: &IdentityInputs) -> ResolvedIdentity {
    if let Some(commit) = non_empty(&inputs.commit_id) {
        return ResolvedIdentity::new(commit, IdentitySource::Environment, SOURCE_OK);
    }

    match git::head_revision(&inputs.repo_dir) {
        Ok(revision) => {
            ResolvedIdentity::new(revision, IdentitySource::Local, NOTE_COMMIT_FROM_GIT)
        }
        Err(e) => {
            debug!(error = %e, "no local git revision; generating owner token");
            ResolvedIdentity::new(random_token(), IdentitySource::Generated, NOTE_COMMIT_RANDOM)
        }
    }
}

/// Resolve the signer identity: CI pipeline id, else `user@host`, else random.
pub fn resolve_signer(inputs: &IdentityInputs) -> ResolvedIdentity {
    if let Some(pipeline) = non_empty(&inputs.pipeline_id) {
        return ResolvedIdentity::new(pipeline, IdentitySource::Environment, SOURCE_OK);
    }

    match non_empty(&inputs.local_user) {
        Some(user) => ResolvedIdentity::new(user, IdentitySource::Local, NOTE_SIGNER_FROM_HOST),
        None => {
            ResolvedIdentity::new(random_token(), IdentitySource::Generated, NOTE_SIGNER_RANDOM)
        }
    }
}

/// `user@host` for the current process, if both parts are known.
fn local_user() -> Option<String> {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()?;
    let host = hostname::get().ok()?.to_string_lossy().to_string();
    Some(format!("{}@{}", user, host))
}
