//! Lock record model and JSON codec.
//!
//! The lock object's byte content is a JSON document:
//!
//! ```json
//! {
//!   "lock_id": "<owner identity>",
//!   "timestamp": "<RFC3339>",
//!   "signer": "<pipeline run id>",
//!   "comments": { "commit": "ok", "trigger": "ok", "extra": "" }
//! }
//! ```
//!
//! Field names are fixed for compatibility with lock files already deployed.
//! The presence of this object at the lock key *is* the lock; there is no
//! separate "locked" flag.

use crate::error::{LockError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Free-text annotations describing how the owner and signer were resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Which fallback tier produced the owner identity (`ok` for the CI value).
    #[serde(rename = "commit", default)]
    pub commit_source: String,

    /// Which fallback tier produced the signer identity (`ok` for the CI value).
    #[serde(rename = "trigger", default)]
    pub trigger_source: String,

    /// Extra warning text; empty when both identities came from CI.
    #[serde(rename = "extra", default)]
    pub note: String,
}

/// The sole persisted entity: who holds the lock, since when, and how that
/// identity was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Identity that created the lock (commit SHA, pipeline id, random token).
    #[serde(rename = "lock_id")]
    pub owner_id: String,

    /// RFC3339 creation time, kept verbatim.
    #[serde(rename = "timestamp")]
    pub created_at: String,

    /// Secondary identity of the triggering process.
    #[serde(default)]
    pub signer: String,

    #[serde(rename = "comments", default)]
    pub provenance: Provenance,
}

impl LockRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        owner_id: impl Into<String>,
        signer: impl Into<String>,
        provenance: Provenance,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            signer: signer.into(),
            provenance,
        }
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| LockError::Codec(format!("failed to serialize lock record: {}", e)))
    }

    /// Parse from the wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LockError::Codec(format!("failed to parse lock record: {}", e)))
    }

    /// True when the record was written by `identity`.
    ///
    /// Ownership is identity equality on `lock_id` only; timestamps, signer,
    /// and provenance never take part.
    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner_id == identity
    }

    /// Parsed creation time, if `created_at` is valid RFC3339.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Format the lock age as a human-readable string.
    pub fn age_string(&self) -> String {
        let Some(created) = self.created_at_utc() else {
            return "unknown".to_string();
        };
        let age = Utc::now().signed_duration_since(created);
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes.max(0))
        }
    }
}

impl std::fmt::Display for LockRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (signer: {}, since: {}, age: {})",
            self.owner_id,
            self.signer,
            self.created_at,
            self.age_string()
        )
    }
}
