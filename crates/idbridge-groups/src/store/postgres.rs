//! PostgreSQL-backed directory store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use idbridge_core::{GroupId, UserId};
use idbridge_db::{
    AppConfigValue, DbPool, DirectoryMember, FederatedGroup, FederatedGroupMember, GroupPresence,
    LegacyGroup, LegacyGroupMember,
};
use sqlx::{Postgres, Transaction};

use crate::config::MigrationConfig;
use crate::directory::{Directory, DirectoryGroup, DirectoryUser};
use crate::error::MigrationResult;
use crate::membership::{MembershipStore, MirrorOutcome};
use crate::registry::ConfigStore;
use crate::transition::TransitionStore;

/// Implements every migration trait on top of the `idbridge-db` tables.
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: DbPool,
    legacy_backend: String,
    federated_backend: String,
}

impl PgDirectoryStore {
    #[must_use]
    pub fn new(pool: DbPool, config: &MigrationConfig) -> Self {
        Self {
            pool,
            legacy_backend: config.legacy_backend.clone(),
            federated_backend: config.federated_backend.clone(),
        }
    }

    fn member_backend(&self, member: &DirectoryMember) -> String {
        if member.is_federated {
            self.federated_backend.clone()
        } else if member.is_local {
            self.legacy_backend.clone()
        } else {
            String::new()
        }
    }
}

#[async_trait]
impl Directory for PgDirectoryStore {
    async fn resolve(&self, gid: &GroupId) -> MigrationResult<Option<DirectoryGroup>> {
        let presence = GroupPresence::find(self.pool.inner(), gid).await?;
        if presence.is_absent() {
            return Ok(None);
        }

        let mut backend_names = BTreeSet::new();
        if presence.in_local {
            backend_names.insert(self.legacy_backend.clone());
        }
        if presence.in_federated {
            backend_names.insert(self.federated_backend.clone());
        }

        let rows = DirectoryMember::list_for_group(self.pool.inner(), gid).await?;
        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(DirectoryUser {
                uid: UserId::new(row.uid.as_str())?,
                backend: self.member_backend(row),
            });
        }

        Ok(Some(DirectoryGroup {
            gid: gid.clone(),
            backend_names,
            members,
        }))
    }
}

#[async_trait]
impl MembershipStore for PgDirectoryStore {
    async fn legacy_members(&self, gid: &GroupId) -> MigrationResult<Vec<UserId>> {
        let uids = LegacyGroupMember::list_uids(self.pool.inner(), gid).await?;
        Ok(uids
            .into_iter()
            .map(UserId::new)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn add_federated_member(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> MigrationResult<MirrorOutcome> {
        let inserted = FederatedGroupMember::add(self.pool.inner(), gid, uid).await?;
        Ok(if inserted {
            MirrorOutcome::Inserted
        } else {
            MirrorOutcome::AlreadyPresent
        })
    }

    async fn delete_legacy_members(&self, gid: &GroupId) -> MigrationResult<u64> {
        Ok(LegacyGroupMember::delete_for_group(self.pool.inner(), gid).await?)
    }
}

#[async_trait]
impl TransitionStore for PgDirectoryStore {
    type Transaction = Transaction<'static, Postgres>;

    async fn begin(&self) -> MigrationResult<Self::Transaction> {
        Ok(self.pool.inner().begin().await?)
    }

    async fn delete_legacy_group(
        &self,
        tx: &mut Self::Transaction,
        gid: &GroupId,
    ) -> MigrationResult<u64> {
        Ok(LegacyGroup::delete(&mut **tx, gid).await?)
    }

    async fn create_federated_group(
        &self,
        tx: &mut Self::Transaction,
        gid: &GroupId,
    ) -> MigrationResult<bool> {
        Ok(FederatedGroup::create(&mut **tx, gid).await?)
    }

    async fn commit(&self, tx: Self::Transaction) -> MigrationResult<()> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: Self::Transaction) -> MigrationResult<()> {
        Ok(tx.rollback().await?)
    }
}

#[async_trait]
impl ConfigStore for PgDirectoryStore {
    async fn get_value(&self, namespace: &str, key: &str) -> MigrationResult<Option<String>> {
        Ok(AppConfigValue::get(self.pool.inner(), namespace, key).await?)
    }

    async fn set_value(&self, namespace: &str, key: &str, value: &str) -> MigrationResult<()> {
        Ok(AppConfigValue::set(self.pool.inner(), namespace, key, value).await?)
    }
}
