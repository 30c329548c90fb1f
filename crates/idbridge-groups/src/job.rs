//! Batch migration job.
//!
//! Takes a list of group ids (usually the groups a user was just assigned
//! at login, or the whole pool during a sweep), keeps those that are still
//! candidates and fully federated, and moves each one to the federated
//! backend independently. Safe to run repeatedly: a migrated group is no
//! longer served by the legacy backend and drops out of the filter.

use std::collections::BTreeSet;
use std::sync::Arc;

use idbridge_core::GroupId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::MigrationConfig;
use crate::directory::Directory;
use crate::membership::{MembershipMigrator, MembershipStore};
use crate::registry::{CandidateRegistry, ConfigStore};
use crate::transition::{GroupTransition, TransitionReport, TransitionStore};

/// Payload of one job invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobArgument {
    pub gids: Vec<GroupId>,
}

impl JobArgument {
    #[must_use]
    pub fn new(gids: Vec<GroupId>) -> Self {
        Self { gids }
    }
}

/// Summary of one job invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Whether a pending candidate pool existed.
    pub pool_available: bool,
    /// Groups that passed the eligibility filter, in attempt order.
    pub eligible: Vec<GroupId>,
    /// Per-group transition outcomes, in attempt order.
    pub transitions: Vec<TransitionReport>,
    /// Whether the registry record was rewritten.
    pub registry_updated: bool,
}

impl JobReport {
    /// Ids of the groups that were migrated.
    #[must_use]
    pub fn migrated(&self) -> Vec<GroupId> {
        self.transitions
            .iter()
            .filter(|t| t.is_migrated())
            .map(|t| t.gid.clone())
            .collect()
    }

    /// Ids of the eligible groups that were not migrated.
    #[must_use]
    pub fn failed(&self) -> Vec<GroupId> {
        self.transitions
            .iter()
            .filter(|t| !t.is_migrated())
            .map(|t| t.gid.clone())
            .collect()
    }
}

/// Moves eligible candidate groups from the legacy backend to the
/// federated backend.
pub struct MigrateGroupsJob<D, C, T, M> {
    directory: Arc<D>,
    registry: CandidateRegistry<C>,
    transition: GroupTransition<T, M>,
    config: MigrationConfig,
}

impl<S> MigrateGroupsJob<S, S, S, S>
where
    S: Directory + ConfigStore + TransitionStore + MembershipStore,
{
    /// Build a job whose collaborators are all served by one store.
    pub fn from_store(store: Arc<S>, config: MigrationConfig) -> Self {
        let app = config.config_namespace.clone();
        let registry = CandidateRegistry::new(Arc::clone(&store), &config);
        let members = MembershipMigrator::new(Arc::clone(&store), app.clone());
        let transition = GroupTransition::new(Arc::clone(&store), members, app);
        Self::new(store, registry, transition, config)
    }
}

impl<D, C, T, M> MigrateGroupsJob<D, C, T, M>
where
    D: Directory,
    C: ConfigStore,
    T: TransitionStore,
    M: MembershipStore,
{
    pub fn new(
        directory: Arc<D>,
        registry: CandidateRegistry<C>,
        transition: GroupTransition<T, M>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            directory,
            registry,
            transition,
            config,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &CandidateRegistry<C> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run the job. Never fails; per-group problems are logged and the
    /// affected groups stay in the pool for a later run.
    #[instrument(skip_all, fields(requested = argument.gids.len()))]
    pub async fn run(&self, argument: &JobArgument) -> JobReport {
        let Some(pool) = self.registry.candidates().await else {
            debug!("No group migration pending");
            return JobReport::default();
        };

        let eligible = self.groups_to_migrate(&argument.gids, &pool).await;
        let mut transitions = Vec::with_capacity(eligible.len());
        for gid in &eligible {
            transitions.push(self.transition.run(gid).await);
        }

        let migrated: BTreeSet<GroupId> = transitions
            .iter()
            .filter(|t| t.is_migrated())
            .map(|t| t.gid.clone())
            .collect();

        let registry_updated = if migrated.is_empty() {
            false
        } else {
            match self.registry.shrink(&migrated).await {
                Ok(updated) => updated,
                Err(e) => {
                    warn!(
                        app = %self.config.config_namespace,
                        error = %e,
                        "Could not update group migration candidates"
                    );
                    false
                }
            }
        };

        info!(
            eligible = eligible.len(),
            migrated = migrated.len(),
            "Group migration run finished"
        );

        JobReport {
            pool_available: true,
            eligible,
            transitions,
            registry_updated,
        }
    }

    /// Filter `gids` down to the groups that may be migrated now.
    ///
    /// A group qualifies when it is in `pool`, resolves in the directory, is
    /// served by the legacy backend, and every member authenticates through
    /// the federated backend. Caller order is kept; duplicates are dropped.
    pub async fn groups_to_migrate(
        &self,
        gids: &[GroupId],
        pool: &BTreeSet<GroupId>,
    ) -> Vec<GroupId> {
        let mut seen = BTreeSet::new();
        let mut eligible = Vec::new();

        for gid in gids {
            if !pool.contains(gid) || !seen.insert(gid) {
                continue;
            }
            if self.is_eligible(gid).await {
                eligible.push(gid.clone());
            }
        }

        eligible
    }

    async fn is_eligible(&self, gid: &GroupId) -> bool {
        let group = match self.directory.resolve(gid).await {
            Ok(Some(group)) => group,
            Ok(None) => {
                debug!(gid = %gid, "Candidate group no longer exists");
                return false;
            }
            Err(e) => {
                warn!(
                    app = %self.config.config_namespace,
                    gid = %gid,
                    error = %e,
                    "Could not look up candidate group"
                );
                return false;
            }
        };

        if !group.is_backed_by(&self.config.legacy_backend) {
            debug!(gid = %gid, "Candidate group is not served by the legacy backend");
            return false;
        }

        if !group.all_members_from(&self.config.federated_backend) {
            debug!(gid = %gid, "Candidate group has members outside the federated backend");
            return false;
        }

        true
    }
}
