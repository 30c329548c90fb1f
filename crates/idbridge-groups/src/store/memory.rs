//! In-memory directory for testing.
//!
//! Implements every storage trait of the migration over one shared state,
//! with transactions that stage changes until commit. Failure injection
//! helpers let tests drive each error path of the transition.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use idbridge_core::{GroupId, UserId};
use tokio::sync::RwLock;

use crate::config::MigrationConfig;
use crate::directory::{Directory, DirectoryGroup, DirectoryUser};
use crate::error::{MigrationError, MigrationResult};
use crate::membership::{MembershipStore, MirrorOutcome};
use crate::registry::ConfigStore;
use crate::transition::TransitionStore;

#[derive(Debug, Default)]
struct DirectoryState {
    local_groups: BTreeSet<String>,
    federated_groups: BTreeSet<String>,
    legacy_members: BTreeMap<String, BTreeSet<String>>,
    federated_members: BTreeMap<String, BTreeSet<String>>,
    user_backends: BTreeMap<String, String>,
    config: BTreeMap<(String, String), String>,
}

#[derive(Debug, Default)]
struct Faults {
    vanished_on_delete: BTreeSet<String>,
    rejected_creates: BTreeSet<String>,
    failing_creates: BTreeSet<String>,
    failing_member_inserts: BTreeSet<(String, String)>,
    failing_member_listings: BTreeSet<String>,
    failing_cleanups: BTreeSet<String>,
    failing_resolves: BTreeSet<String>,
    failing_config_reads: bool,
}

/// Number of calls made to the transactional and cleanup primitives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub cleanups: usize,
    pub config_writes: usize,
}

/// Changes staged by an open in-memory transaction.
#[derive(Debug, Default)]
pub struct MemoryTransaction {
    deleted: Vec<String>,
    created: Vec<String>,
}

/// In-memory implementation of the directory, membership, transition and
/// config stores.
#[derive(Debug)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
    faults: RwLock<Faults>,
    calls: RwLock<CallCounts>,
    legacy_backend: String,
    federated_backend: String,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::with_config(&MigrationConfig::default())
    }
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store reporting the backend names of `config`.
    #[must_use]
    pub fn with_config(config: &MigrationConfig) -> Self {
        Self {
            state: RwLock::new(DirectoryState::default()),
            faults: RwLock::new(Faults::default()),
            calls: RwLock::new(CallCounts::default()),
            legacy_backend: config.legacy_backend.clone(),
            federated_backend: config.federated_backend.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    pub async fn add_local_group(&self, gid: &str) {
        self.state.write().await.local_groups.insert(gid.to_string());
    }

    pub async fn add_federated_group(&self, gid: &str) {
        self.state
            .write()
            .await
            .federated_groups
            .insert(gid.to_string());
    }

    pub async fn add_local_user(&self, uid: &str) {
        let backend = self.legacy_backend.clone();
        self.state
            .write()
            .await
            .user_backends
            .insert(uid.to_string(), backend);
    }

    pub async fn add_federated_user(&self, uid: &str) {
        let backend = self.federated_backend.clone();
        self.state
            .write()
            .await
            .user_backends
            .insert(uid.to_string(), backend);
    }

    pub async fn add_legacy_member(&self, gid: &str, uid: &str) {
        self.state
            .write()
            .await
            .legacy_members
            .entry(gid.to_string())
            .or_default()
            .insert(uid.to_string());
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub async fn has_local_group(&self, gid: &GroupId) -> bool {
        self.state.read().await.local_groups.contains(gid.as_str())
    }

    pub async fn has_federated_group(&self, gid: &GroupId) -> bool {
        self.state
            .read()
            .await
            .federated_groups
            .contains(gid.as_str())
    }

    /// Members of `gid` in the federated membership table, sorted.
    pub async fn federated_members(&self, gid: &GroupId) -> Vec<UserId> {
        self.state
            .read()
            .await
            .federated_members
            .get(gid.as_str())
            .map(|uids| {
                uids.iter()
                    .filter_map(|uid| UserId::new(uid.as_str()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn calls(&self) -> CallCounts {
        *self.calls.read().await
    }

    // ------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------

    /// The legacy delete for `gid` affects zero rows.
    pub async fn vanish_on_delete(&self, gid: &str) {
        self.faults
            .write()
            .await
            .vanished_on_delete
            .insert(gid.to_string());
    }

    /// The federated backend answers `false` when creating `gid`.
    pub async fn reject_create(&self, gid: &str) {
        self.faults
            .write()
            .await
            .rejected_creates
            .insert(gid.to_string());
    }

    /// Creating `gid` in the federated backend raises a storage error.
    pub async fn fail_create(&self, gid: &str) {
        self.faults
            .write()
            .await
            .failing_creates
            .insert(gid.to_string());
    }

    /// Mirroring `uid` into `gid` raises a storage error.
    pub async fn fail_member_insert(&self, gid: &str, uid: &str) {
        self.faults
            .write()
            .await
            .failing_member_inserts
            .insert((gid.to_string(), uid.to_string()));
    }

    /// Listing the legacy members of `gid` raises a storage error.
    pub async fn fail_member_listing(&self, gid: &str) {
        self.faults
            .write()
            .await
            .failing_member_listings
            .insert(gid.to_string());
    }

    /// Deleting the legacy members of `gid` raises a storage error.
    pub async fn fail_cleanup(&self, gid: &str) {
        self.faults
            .write()
            .await
            .failing_cleanups
            .insert(gid.to_string());
    }

    /// Resolving `gid` raises a storage error.
    pub async fn fail_resolve(&self, gid: &str) {
        self.faults
            .write()
            .await
            .failing_resolves
            .insert(gid.to_string());
    }

    pub async fn fail_config_reads(&self, fail: bool) {
        self.faults.write().await.failing_config_reads = fail;
    }

    /// Remove every injected failure.
    pub async fn clear_faults(&self) {
        *self.faults.write().await = Faults::default();
    }
}

fn injected(what: &str, key: &str) -> MigrationError {
    MigrationError::Backend(format!("injected {what} failure for {key}"))
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn resolve(&self, gid: &GroupId) -> MigrationResult<Option<DirectoryGroup>> {
        if self.faults.read().await.failing_resolves.contains(gid.as_str()) {
            return Err(injected("resolve", gid.as_str()));
        }

        let state = self.state.read().await;
        let mut backend_names = BTreeSet::new();
        if state.local_groups.contains(gid.as_str()) {
            backend_names.insert(self.legacy_backend.clone());
        }
        if state.federated_groups.contains(gid.as_str()) {
            backend_names.insert(self.federated_backend.clone());
        }
        if backend_names.is_empty() {
            return Ok(None);
        }

        let uids: BTreeSet<&String> = state
            .legacy_members
            .get(gid.as_str())
            .into_iter()
            .chain(state.federated_members.get(gid.as_str()))
            .flatten()
            .collect();

        let members = uids
            .into_iter()
            .map(|uid| -> MigrationResult<DirectoryUser> {
                Ok(DirectoryUser {
                    uid: UserId::new(uid.as_str())?,
                    backend: state.user_backends.get(uid).cloned().unwrap_or_default(),
                })
            })
            .collect::<MigrationResult<Vec<_>>>()?;

        Ok(Some(DirectoryGroup {
            gid: gid.clone(),
            backend_names,
            members,
        }))
    }
}

#[async_trait]
impl MembershipStore for InMemoryDirectory {
    async fn legacy_members(&self, gid: &GroupId) -> MigrationResult<Vec<UserId>> {
        if self
            .faults
            .read()
            .await
            .failing_member_listings
            .contains(gid.as_str())
        {
            return Err(injected("member listing", gid.as_str()));
        }

        let state = self.state.read().await;
        let mut members = Vec::new();
        if let Some(uids) = state.legacy_members.get(gid.as_str()) {
            for uid in uids {
                members.push(UserId::new(uid.as_str())?);
            }
        }
        Ok(members)
    }

    async fn add_federated_member(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> MigrationResult<MirrorOutcome> {
        let key = (gid.to_string(), uid.to_string());
        if self.faults.read().await.failing_member_inserts.contains(&key) {
            return Err(injected("member insert", &format!("{gid}/{uid}")));
        }

        let mut state = self.state.write().await;
        let inserted = state
            .federated_members
            .entry(key.0)
            .or_default()
            .insert(key.1);
        Ok(if inserted {
            MirrorOutcome::Inserted
        } else {
            MirrorOutcome::AlreadyPresent
        })
    }

    async fn delete_legacy_members(&self, gid: &GroupId) -> MigrationResult<u64> {
        self.calls.write().await.cleanups += 1;
        if self.faults.read().await.failing_cleanups.contains(gid.as_str()) {
            return Err(injected("cleanup", gid.as_str()));
        }

        let removed = self
            .state
            .write()
            .await
            .legacy_members
            .remove(gid.as_str())
            .map_or(0, |uids| uids.len());
        Ok(removed as u64)
    }
}

#[async_trait]
impl TransitionStore for InMemoryDirectory {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> MigrationResult<MemoryTransaction> {
        self.calls.write().await.begins += 1;
        Ok(MemoryTransaction::default())
    }

    async fn delete_legacy_group(
        &self,
        tx: &mut MemoryTransaction,
        gid: &GroupId,
    ) -> MigrationResult<u64> {
        if self
            .faults
            .read()
            .await
            .vanished_on_delete
            .contains(gid.as_str())
        {
            return Ok(0);
        }

        let exists = self.state.read().await.local_groups.contains(gid.as_str());
        let already_staged = tx.deleted.iter().any(|g| g == gid.as_str());
        if !exists || already_staged {
            return Ok(0);
        }

        tx.deleted.push(gid.to_string());
        Ok(1)
    }

    async fn create_federated_group(
        &self,
        tx: &mut MemoryTransaction,
        gid: &GroupId,
    ) -> MigrationResult<bool> {
        {
            let faults = self.faults.read().await;
            if faults.failing_creates.contains(gid.as_str()) {
                return Err(injected("create", gid.as_str()));
            }
            if faults.rejected_creates.contains(gid.as_str()) {
                return Ok(false);
            }
        }

        let exists = self
            .state
            .read()
            .await
            .federated_groups
            .contains(gid.as_str());
        if exists || tx.created.iter().any(|g| g == gid.as_str()) {
            return Ok(false);
        }

        tx.created.push(gid.to_string());
        Ok(true)
    }

    async fn commit(&self, tx: MemoryTransaction) -> MigrationResult<()> {
        let mut state = self.state.write().await;
        for gid in &tx.deleted {
            state.local_groups.remove(gid);
        }
        for gid in tx.created {
            state.federated_groups.insert(gid);
        }
        drop(state);

        self.calls.write().await.commits += 1;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTransaction) -> MigrationResult<()> {
        self.calls.write().await.rollbacks += 1;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for InMemoryDirectory {
    async fn get_value(&self, namespace: &str, key: &str) -> MigrationResult<Option<String>> {
        if self.faults.read().await.failing_config_reads {
            return Err(injected("config read", key));
        }

        Ok(self
            .state
            .read()
            .await
            .config
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_value(&self, namespace: &str, key: &str, value: &str) -> MigrationResult<()> {
        self.state
            .write()
            .await
            .config
            .insert((namespace.to_string(), key.to_string()), value.to_string());
        self.calls.write().await.config_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid(id: &str) -> GroupId {
        GroupId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_unknown_group() {
        let store = InMemoryDirectory::new();
        assert!(store.resolve(&gid("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_reports_backends_and_members() {
        let store = InMemoryDirectory::new();
        store.add_local_group("sales").await;
        store.add_local_user("carol").await;
        store.add_federated_user("alice").await;
        store.add_legacy_member("sales", "alice").await;
        store.add_legacy_member("sales", "carol").await;

        let group = store.resolve(&gid("sales")).await.unwrap().unwrap();
        assert!(group.is_backed_by("Database"));
        assert_eq!(group.members.len(), 2);
        assert!(!group.all_members_from("federated"));
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_changes_nothing() {
        let store = InMemoryDirectory::new();
        store.add_local_group("sales").await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(store.delete_legacy_group(&mut tx, &gid("sales")).await.unwrap(), 1);
        assert_eq!(store.delete_legacy_group(&mut tx, &gid("sales")).await.unwrap(), 0);
        assert!(store.create_federated_group(&mut tx, &gid("sales")).await.unwrap());
        store.rollback(tx).await.unwrap();

        assert!(store.has_local_group(&gid("sales")).await);
        assert!(!store.has_federated_group(&gid("sales")).await);
    }

    #[tokio::test]
    async fn test_commit_applies_staged_changes() {
        let store = InMemoryDirectory::new();
        store.add_local_group("sales").await;

        let mut tx = store.begin().await.unwrap();
        store.delete_legacy_group(&mut tx, &gid("sales")).await.unwrap();
        store.create_federated_group(&mut tx, &gid("sales")).await.unwrap();
        store.commit(tx).await.unwrap();

        assert!(!store.has_local_group(&gid("sales")).await);
        assert!(store.has_federated_group(&gid("sales")).await);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_federated_group() {
        let store = InMemoryDirectory::new();
        store.add_federated_group("sales").await;

        let mut tx = store.begin().await.unwrap();
        assert!(!store.create_federated_group(&mut tx, &gid("sales")).await.unwrap());
    }
}
