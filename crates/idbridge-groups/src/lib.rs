//! # Group Backend Migration
//!
//! Moves groups that are stored by the local database backend, but whose
//! members all sign in through the federated identity provider, over to
//! the federated backend while keeping their membership.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   gids   ┌──────────────────┐  per group  ┌───────────────────┐
//! │ MigrationWorker  │─────────►│ MigrateGroupsJob │────────────►│  GroupTransition  │
//! │ (queue + sweep)  │          │ (filter, shrink) │             │ mirror → swap →   │
//! └──────────────────┘          └────────┬─────────┘             │ cleanup           │
//!                                        │                       └─────────┬─────────┘
//!                               ┌────────▼──────────┐            ┌─────────▼─────────┐
//!                               │ CandidateRegistry │            │MembershipMigrator │
//!                               └───────────────────┘            └───────────────────┘
//! ```
//!
//! Storage is reached through four traits ([`Directory`], [`ConfigStore`],
//! [`TransitionStore`], [`MembershipStore`]) implemented by
//! [`PgDirectoryStore`] for PostgreSQL and [`InMemoryDirectory`] for tests.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idbridge_groups::{JobArgument, MigrateGroupsJob, MigrationConfig, PgDirectoryStore};
//!
//! let config = MigrationConfig::default();
//! let store = Arc::new(PgDirectoryStore::new(pool, &config));
//! let job = MigrateGroupsJob::from_store(store, config);
//!
//! let report = job.run(&JobArgument::new(vec!["sales".parse()?])).await;
//! println!("migrated: {:?}", report.migrated());
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod job;
pub mod membership;
pub mod registry;
pub mod store;
pub mod transition;
pub mod worker;

pub use config::MigrationConfig;
pub use directory::{Directory, DirectoryGroup, DirectoryUser};
pub use error::{MigrationError, MigrationResult};
pub use job::{JobArgument, JobReport, MigrateGroupsJob};
pub use membership::{MembershipMigrator, MembershipStore, MirrorOutcome};
pub use registry::{
    CandidatePool, CandidateRegistry, ConfigStore, PoolPhase, StoredRecord, EXPIRED_SENTINEL,
};
pub use store::{CallCounts, InMemoryDirectory, MemoryTransaction, PgDirectoryStore};
pub use transition::{
    CleanupStatus, GroupTransition, TransitionReport, TransitionState, TransitionStore,
};
pub use worker::{MigrationQueue, MigrationWorker, WorkerConfig};
