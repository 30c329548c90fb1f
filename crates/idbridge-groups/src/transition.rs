//! Per-group backend transition.
//!
//! ```text
//! Start ──mirror──► MembersMirrored ──begin/delete──► LegacyDeleted
//!                                                          │ create
//!                                                          ▼
//!            RolledBack ◄──any error──  BackendCreated ──commit──► Committed
//! ```
//!
//! Only the delete/create pair runs inside the store transaction, so the
//! group is never owned by both backends or by neither. Mirroring happens
//! before the transaction and cleanup after it; both are idempotent and
//! their failures never undo a committed swap.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use idbridge_core::GroupId;
use tracing::{debug, info, instrument, warn};

use crate::error::{MigrationError, MigrationResult};
use crate::membership::{MembershipMigrator, MembershipStore};

/// Transactional storage for the ownership swap.
#[async_trait]
pub trait TransitionStore: Send + Sync {
    /// Open transaction handle.
    type Transaction: Send;

    /// Begin a transaction.
    async fn begin(&self) -> MigrationResult<Self::Transaction>;

    /// Delete the legacy group record, returning the affected row count.
    async fn delete_legacy_group(
        &self,
        tx: &mut Self::Transaction,
        gid: &GroupId,
    ) -> MigrationResult<u64>;

    /// Create the group under the federated backend. `false` means the
    /// backend rejected it.
    async fn create_federated_group(
        &self,
        tx: &mut Self::Transaction,
        gid: &GroupId,
    ) -> MigrationResult<bool>;

    /// Commit the transaction.
    async fn commit(&self, tx: Self::Transaction) -> MigrationResult<()>;

    /// Roll the transaction back.
    async fn rollback(&self, tx: Self::Transaction) -> MigrationResult<()>;
}

/// States of a group transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Start,
    MembersMirrored,
    LegacyDeleted,
    BackendCreated,
    Committed,
    RolledBack,
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::MembersMirrored => write!(f, "members_mirrored"),
            Self::LegacyDeleted => write!(f, "legacy_deleted"),
            Self::BackendCreated => write!(f, "backend_created"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// What happened to the legacy membership rows after the swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStatus {
    /// Not attempted: the swap did not commit or mirroring was partial.
    Skipped,
    /// Legacy rows removed.
    Completed { removed: u64 },
    /// Removal failed; the rows remain for a later pass.
    Failed,
}

/// Outcome of one group transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub gid: GroupId,
    /// `Committed` or `RolledBack`.
    pub state: TransitionState,
    /// Last state reached before a rollback.
    pub failed_after: Option<TransitionState>,
    pub members_mirrored: bool,
    pub cleanup: CleanupStatus,
}

impl TransitionReport {
    #[must_use]
    pub fn is_migrated(&self) -> bool {
        self.state == TransitionState::Committed
    }
}

/// Drives a single group from the legacy backend to the federated one.
pub struct GroupTransition<T, M> {
    store: Arc<T>,
    members: MembershipMigrator<M>,
    app: String,
}

impl<T, M> GroupTransition<T, M>
where
    T: TransitionStore,
    M: MembershipStore,
{
    /// Create a transition driver. `app` tags log events.
    pub fn new(store: Arc<T>, members: MembershipMigrator<M>, app: impl Into<String>) -> Self {
        Self {
            store,
            members,
            app: app.into(),
        }
    }

    /// Run the full transition for `gid`. Never fails: errors are logged
    /// and reported as a rolled back transition.
    #[instrument(skip_all, fields(gid = %gid))]
    pub async fn run(&self, gid: &GroupId) -> TransitionReport {
        let members_mirrored = match self.members.migrate_group_users(gid).await {
            Ok(complete) => complete,
            Err(e) => {
                warn!(app = %self.app, gid = %gid, error = %e, "{e}");
                return TransitionReport {
                    gid: gid.clone(),
                    state: TransitionState::RolledBack,
                    failed_after: Some(TransitionState::Start),
                    members_mirrored: false,
                    cleanup: CleanupStatus::Skipped,
                };
            }
        };

        let mut reached = TransitionState::MembersMirrored;
        let (state, failed_after) = match self.swap_backend(gid, &mut reached).await {
            Ok(()) => (TransitionState::Committed, None),
            Err(e) => {
                warn!(
                    app = %self.app,
                    gid = %gid,
                    failed_after = %reached,
                    aborted = e.is_transition_aborted(),
                    error = %e,
                    "Group transition rolled back"
                );
                (TransitionState::RolledBack, Some(reached))
            }
        };

        let cleanup = if members_mirrored && state == TransitionState::Committed {
            self.clean_up(gid).await
        } else {
            CleanupStatus::Skipped
        };

        if state == TransitionState::Committed {
            info!(gid = %gid, "Migrated group to federated backend");
        }

        TransitionReport {
            gid: gid.clone(),
            state,
            failed_after,
            members_mirrored,
            cleanup,
        }
    }

    /// Delete the legacy record and create the federated group atomically.
    async fn swap_backend(
        &self,
        gid: &GroupId,
        reached: &mut TransitionState,
    ) -> MigrationResult<()> {
        let mut tx = self.store.begin().await?;

        match self.apply(&mut tx, gid, reached).await {
            Ok(()) => {
                self.store.commit(tx).await?;
                *reached = TransitionState::Committed;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = self.store.rollback(tx).await {
                    warn!(
                        app = %self.app,
                        gid = %gid,
                        error = %rollback_err,
                        "Rollback of group transition failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut T::Transaction,
        gid: &GroupId,
        reached: &mut TransitionState,
    ) -> MigrationResult<()> {
        let affected = self.store.delete_legacy_group(tx, gid).await?;
        if affected == 0 {
            return Err(MigrationError::LegacyGroupMissing(gid.clone()));
        }
        *reached = TransitionState::LegacyDeleted;

        if !self.store.create_federated_group(tx, gid).await? {
            return Err(MigrationError::BackendRejected(gid.clone()));
        }
        *reached = TransitionState::BackendCreated;

        debug!(gid = %gid, "Group ownership swapped, committing");
        Ok(())
    }

    async fn clean_up(&self, gid: &GroupId) -> CleanupStatus {
        match self.members.clean_up_old_group_users(gid).await {
            Ok(removed) => CleanupStatus::Completed { removed },
            Err(e) => {
                warn!(
                    app = %self.app,
                    gid = %gid,
                    error = %e,
                    "Error while cleaning up legacy group members of group {gid}"
                );
                CleanupStatus::Failed
            }
        }
    }
}
