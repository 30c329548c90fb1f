//! Error types for group migration.

use idbridge_core::{GroupId, ParseIdError};
use idbridge_db::DbError;
use thiserror::Error;

/// Result alias for migration operations.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors raised while migrating groups between directory backends.
///
/// None of these reach an interactive caller: the transition and the job
/// log them and report the affected group as not migrated.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The legacy group record was already gone when the delete ran.
    #[error("Could not delete group {0} from local backend")]
    LegacyGroupMissing(GroupId),

    /// The federated backend refused to create the group.
    #[error("Could not create group {0} in federated backend")]
    BackendRejected(GroupId),

    /// A PostgreSQL operation failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// A non-SQL storage collaborator failed.
    #[error("Storage backend failure: {0}")]
    Backend(String),

    /// A stored identifier was not a valid id.
    #[error(transparent)]
    InvalidIdentifier(#[from] ParseIdError),

    /// The candidate record could not be encoded or decoded.
    #[error("Candidate record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The migration queue has no consumer anymore.
    #[error("Migration queue is closed")]
    QueueClosed,
}

impl MigrationError {
    /// True for the two expected aborts of a transition (as opposed to an
    /// unexpected storage failure).
    #[must_use]
    pub fn is_transition_aborted(&self) -> bool {
        matches!(
            self,
            MigrationError::LegacyGroupMissing(_) | MigrationError::BackendRejected(_)
        )
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        MigrationError::Database(DbError::from(err))
    }
}
