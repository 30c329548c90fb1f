//! idbridge Database Layer
//!
//! PostgreSQL schema and row helpers for the two directory backends that
//! idbridge reconciles:
//!
//! - the local database backend (`groups`, `group_user`, `users`)
//! - the federated identity backend (`federated_groups`,
//!   `federated_group_members`, `federated_users`)
//!
//! plus the per-app key/value store (`app_config`).
//!
//! Helpers return `sqlx::Error` so callers can decide how to classify
//! failures; [`DbError`] is the crate-level error for pool and migration
//! setup and a convenient wrapper for query failures.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{
    AppConfigValue, DirectoryMember, FederatedGroup, FederatedGroupMember, FederatedUser,
    GroupPresence, LegacyGroup, LegacyGroupMember,
};
pub use pool::{DbPool, DEFAULT_MAX_CONNECTIONS};
