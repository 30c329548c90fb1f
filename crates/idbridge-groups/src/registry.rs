//! Candidate registry.
//!
//! A scan (run elsewhere) records which database-backed groups may move to
//! the federated backend, together with a deadline. The record lives in the
//! config store as JSON:
//!
//! ```json
//! {"groups": ["sales", "finance"], "dropAfter": 1767225600}
//! ```
//!
//! Earlier writers may leave `groups` as an object keyed by position
//! (`{"1": "B", "3": "D"}`); its values are read as the list. Entries that
//! are not valid group ids are skipped, the rest of the pool stays usable.
//!
//! Once the deadline passes or the pool runs empty the record is replaced
//! by the [`EXPIRED_SENTINEL`] string and is no longer consulted.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idbridge_core::GroupId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::error::MigrationResult;

/// Value stored in place of the record once the pool has expired.
pub const EXPIRED_SENTINEL: &str = "EXPIRED";

/// Key/value configuration storage.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read a value, `None` if it was never written.
    async fn get_value(&self, namespace: &str, key: &str) -> MigrationResult<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set_value(&self, namespace: &str, key: &str, value: &str) -> MigrationResult<()>;
}

/// Lifecycle phase of a candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPhase {
    Pending,
    Expired,
}

/// The persisted set of groups eligible for migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePool {
    #[serde(deserialize_with = "deserialize_groups")]
    pub groups: BTreeSet<GroupId>,

    #[serde(rename = "dropAfter", with = "chrono::serde::ts_seconds")]
    pub drop_after: DateTime<Utc>,

    /// Fields written by the scan that this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn deserialize_groups<'de, D>(deserializer: D) -> Result<BTreeSet<GroupId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawGroups {
        List(Vec<Value>),
        Keyed(serde_json::Map<String, Value>),
    }

    let entries: Vec<Value> = match RawGroups::deserialize(deserializer)? {
        RawGroups::List(values) => values,
        RawGroups::Keyed(map) => map.into_iter().map(|(_, value)| value).collect(),
    };

    Ok(entries.into_iter().filter_map(candidate_gid).collect())
}

fn candidate_gid(entry: Value) -> Option<GroupId> {
    let raw = match entry {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            warn!(entry = %other, "Skipping group migration candidate that is not a string");
            return None;
        }
    };

    match GroupId::new(raw) {
        Ok(gid) => Some(gid),
        Err(e) => {
            warn!(error = %e, "Skipping invalid group migration candidate");
            None
        }
    }
}

impl CandidatePool {
    /// Create a pool with no extra fields.
    #[must_use]
    pub fn new(groups: BTreeSet<GroupId>, drop_after: DateTime<Utc>) -> Self {
        Self {
            groups,
            drop_after,
            extra: serde_json::Map::new(),
        }
    }

    /// Phase of the pool at `now`.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> PoolPhase {
        if self.drop_after < now || self.groups.is_empty() {
            PoolPhase::Expired
        } else {
            PoolPhase::Pending
        }
    }

    /// Encode as the stored JSON record.
    pub fn to_record(&self) -> MigrationResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What the config store currently holds for the candidate key.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    Missing,
    Expired,
    Malformed,
    Present(CandidatePool),
}

impl StoredRecord {
    /// Classify a raw config value.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => Self::Missing,
            Some(EXPIRED_SENTINEL) => Self::Expired,
            Some(json) => match serde_json::from_str::<CandidatePool>(json) {
                Ok(pool) => Self::Present(pool),
                Err(_) => Self::Malformed,
            },
        }
    }
}

/// Reads and shrinks the candidate pool. Callers never touch the
/// underlying config key directly.
pub struct CandidateRegistry<C> {
    store: Arc<C>,
    namespace: String,
    key: String,
}

impl<C> Clone for CandidateRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace.clone(),
            key: self.key.clone(),
        }
    }
}

impl<C: ConfigStore> CandidateRegistry<C> {
    /// Create a registry over `store` using the configured namespace and key.
    pub fn new(store: Arc<C>, config: &MigrationConfig) -> Self {
        Self {
            store,
            namespace: config.config_namespace.clone(),
            key: config.candidates_key.clone(),
        }
    }

    /// Load and classify the stored record.
    pub async fn load(&self) -> MigrationResult<StoredRecord> {
        let raw = self.store.get_value(&self.namespace, &self.key).await?;
        Ok(StoredRecord::parse(raw.as_deref()))
    }

    /// Current candidates, or `None` when there is nothing to migrate.
    pub async fn candidates(&self) -> Option<BTreeSet<GroupId>> {
        self.candidates_at(Utc::now()).await
    }

    /// Current candidates as of `now`.
    ///
    /// An elapsed deadline or an empty pool moves the record to the expired
    /// phase. Read failures are logged and treated as "no candidates".
    pub async fn candidates_at(&self, now: DateTime<Utc>) -> Option<BTreeSet<GroupId>> {
        let record = match self.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(app = %self.namespace, error = %e, "Could not read group migration candidates");
                return None;
            }
        };

        let pool = match record {
            StoredRecord::Present(pool) => pool,
            other => {
                debug!(app = %self.namespace, record = ?other, "No group migration candidates");
                return None;
            }
        };

        match pool.phase_at(now) {
            PoolPhase::Pending => Some(pool.groups),
            PoolPhase::Expired => {
                self.expire().await;
                None
            }
        }
    }

    /// Remove migrated groups from the pool.
    ///
    /// Missing, malformed and expired records are left untouched. Returns
    /// whether the record was rewritten.
    pub async fn shrink(&self, migrated: &BTreeSet<GroupId>) -> MigrationResult<bool> {
        let mut pool = match self.load().await? {
            StoredRecord::Present(pool) => pool,
            _ => return Ok(false),
        };

        pool.groups.retain(|gid| !migrated.contains(gid));
        self.store
            .set_value(&self.namespace, &self.key, &pool.to_record()?)
            .await?;

        debug!(
            app = %self.namespace,
            removed = migrated.len(),
            remaining = pool.groups.len(),
            "Shrunk group migration candidate pool"
        );
        Ok(true)
    }

    async fn expire(&self) {
        match self
            .store
            .set_value(&self.namespace, &self.key, EXPIRED_SENTINEL)
            .await
        {
            Ok(()) => info!(app = %self.namespace, "Group migration phase expired"),
            Err(e) => warn!(app = %self.namespace, error = %e, "Could not mark group migration phase as expired"),
        }
    }
}
