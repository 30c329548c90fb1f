//! Shared fixtures for the group migration scenario tests.
//!
//! Scenario tests run against `InMemoryDirectory`; no database is needed.
//! The `postgres` fixtures are only built with the `integration` feature.

#![allow(dead_code)]

#[cfg(feature = "integration")]
pub mod postgres;

use std::collections::BTreeSet;
use std::sync::{Arc, Once};

use chrono::{DateTime, Duration, Utc};
use idbridge_core::GroupId;
use idbridge_groups::{
    CandidatePool, ConfigStore, InMemoryDirectory, MigrateGroupsJob, MigrationConfig,
    StoredRecord,
};

static INIT: Once = Once::new();

/// Initialize logging for tests (once, only when RUST_LOG is set).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub type MemoryJob =
    MigrateGroupsJob<InMemoryDirectory, InMemoryDirectory, InMemoryDirectory, InMemoryDirectory>;

pub fn gid(id: &str) -> GroupId {
    GroupId::new(id).expect("valid gid")
}

pub fn gids(ids: &[&str]) -> Vec<GroupId> {
    ids.iter().map(|id| gid(id)).collect()
}

pub fn gid_set(ids: &[&str]) -> BTreeSet<GroupId> {
    ids.iter().map(|id| gid(id)).collect()
}

/// A directory plus a job wired to it.
pub struct TestContext {
    pub store: Arc<InMemoryDirectory>,
    pub job: MemoryJob,
    pub config: MigrationConfig,
    pub drop_after: DateTime<Utc>,
}

impl TestContext {
    pub fn new() -> Self {
        init_test_logging();
        let config = MigrationConfig::default();
        let store = Arc::new(InMemoryDirectory::with_config(&config));
        let job = MigrateGroupsJob::from_store(Arc::clone(&store), config.clone());
        // Whole seconds, as stored.
        let drop_after = DateTime::from_timestamp((Utc::now() + Duration::days(14)).timestamp(), 0)
            .expect("valid timestamp");
        Self {
            store,
            job,
            config,
            drop_after,
        }
    }

    /// Store a pending candidate pool.
    pub async fn seed_pool(&self, groups: &[&str]) {
        let record = CandidatePool::new(gid_set(groups), self.drop_after)
            .to_record()
            .expect("encode pool");
        self.write_raw_record(&record).await;
    }

    pub async fn write_raw_record(&self, raw: &str) {
        self.store
            .set_value(&self.config.config_namespace, &self.config.candidates_key, raw)
            .await
            .expect("write record");
    }

    pub async fn raw_record(&self) -> Option<String> {
        self.store
            .get_value(&self.config.config_namespace, &self.config.candidates_key)
            .await
            .expect("read record")
    }

    /// The stored pool; panics unless a well-formed record is present.
    pub async fn stored_pool(&self) -> CandidatePool {
        match StoredRecord::parse(self.raw_record().await.as_deref()) {
            StoredRecord::Present(pool) => pool,
            other => panic!("expected a stored pool, found {other:?}"),
        }
    }

    /// A database-backed group whose members all use the federated backend.
    pub async fn federated_only_group(&self, gid: &str, members: &[&str]) {
        self.store.add_local_group(gid).await;
        for uid in members {
            self.store.add_federated_user(uid).await;
            self.store.add_legacy_member(gid, uid).await;
        }
    }
}
