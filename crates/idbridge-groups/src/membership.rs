//! Membership mirroring.
//!
//! Copies a group's legacy `group_user` rows into the federated backend's
//! membership table before the ownership swap, and purges the legacy rows
//! afterwards. Both steps run outside the swap transaction and are safe to
//! repeat.

use std::sync::Arc;

use async_trait::async_trait;
use idbridge_core::{GroupId, UserId};
use tracing::{debug, warn};

use crate::error::MigrationResult;

/// Result of mirroring a single membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Inserted,
    AlreadyPresent,
}

/// Storage of both backends' membership rows.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Members recorded for `gid` in the legacy table.
    async fn legacy_members(&self, gid: &GroupId) -> MigrationResult<Vec<UserId>>;

    /// Ensure `(gid, uid)` exists in the federated membership table.
    async fn add_federated_member(
        &self,
        gid: &GroupId,
        uid: &UserId,
    ) -> MigrationResult<MirrorOutcome>;

    /// Delete every legacy membership row of `gid`.
    async fn delete_legacy_members(&self, gid: &GroupId) -> MigrationResult<u64>;
}

/// Mirrors and cleans up membership rows for one group at a time.
pub struct MembershipMigrator<M> {
    store: Arc<M>,
    app: String,
}

impl<M> Clone for MembershipMigrator<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            app: self.app.clone(),
        }
    }
}

impl<M: MembershipStore> MembershipMigrator<M> {
    /// Create a migrator. `app` tags log events.
    pub fn new(store: Arc<M>, app: impl Into<String>) -> Self {
        Self {
            store,
            app: app.into(),
        }
    }

    /// Mirror every legacy member of `gid` into the federated backend.
    ///
    /// Returns `true` only if every member is now present on the federated
    /// side. A failed insert is logged and skipped; failing to list the
    /// legacy members is an error.
    pub async fn migrate_group_users(&self, gid: &GroupId) -> MigrationResult<bool> {
        let members = self.store.legacy_members(gid).await?;
        let mut all_users_inserted = true;

        for uid in &members {
            match self.store.add_federated_member(gid, uid).await {
                Ok(MirrorOutcome::Inserted | MirrorOutcome::AlreadyPresent) => {}
                Err(e) => {
                    warn!(
                        app = %self.app,
                        gid = %gid,
                        uid = %uid,
                        error = %e,
                        "Could not mirror group member to federated backend"
                    );
                    all_users_inserted = false;
                }
            }
        }

        debug!(
            gid = %gid,
            members = members.len(),
            complete = all_users_inserted,
            "Mirrored group members"
        );
        Ok(all_users_inserted)
    }

    /// Delete the legacy membership rows of `gid`.
    pub async fn clean_up_old_group_users(&self, gid: &GroupId) -> MigrationResult<u64> {
        let removed = self.store.delete_legacy_members(gid).await?;
        debug!(gid = %gid, removed, "Removed legacy group members");
        Ok(removed)
    }
}
