//! Read-only view of the directory used by the eligibility filter.

use std::collections::BTreeSet;

use async_trait::async_trait;
use idbridge_core::{GroupId, UserId};

use crate::error::MigrationResult;

/// A member of a directory group and the backend that owns its account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub uid: UserId,
    pub backend: String,
}

/// A group as seen through the directory, across all backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub gid: GroupId,
    pub backend_names: BTreeSet<String>,
    pub members: Vec<DirectoryUser>,
}

impl DirectoryGroup {
    /// Whether `backend` currently serves this group.
    #[must_use]
    pub fn is_backed_by(&self, backend: &str) -> bool {
        self.backend_names.contains(backend)
    }

    /// Whether every member authenticates through `backend`. Vacuously
    /// true for a group without members.
    #[must_use]
    pub fn all_members_from(&self, backend: &str) -> bool {
        self.members.iter().all(|m| m.backend == backend)
    }
}

/// Group lookup primitive of the directory.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a group, `None` if no backend knows it.
    async fn resolve(&self, gid: &GroupId) -> MigrationResult<Option<DirectoryGroup>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(backends: &[&str], members: &[(&str, &str)]) -> DirectoryGroup {
        DirectoryGroup {
            gid: GroupId::new("sales").unwrap(),
            backend_names: backends.iter().map(|b| (*b).to_string()).collect(),
            members: members
                .iter()
                .map(|(uid, backend)| DirectoryUser {
                    uid: UserId::new(*uid).unwrap(),
                    backend: (*backend).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_is_backed_by() {
        let g = group(&["Database"], &[]);
        assert!(g.is_backed_by("Database"));
        assert!(!g.is_backed_by("federated"));
    }

    #[test]
    fn test_all_members_from_rejects_mixed_group() {
        let g = group(
            &["Database"],
            &[("alice", "federated"), ("bob", "Database")],
        );
        assert!(!g.all_members_from("federated"));
    }

    #[test]
    fn test_all_members_from_empty_group() {
        let g = group(&["Database"], &[]);
        assert!(g.all_members_from("federated"));
    }
}
