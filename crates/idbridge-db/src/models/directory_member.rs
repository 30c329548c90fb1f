//! Cross-backend directory lookups.
//!
//! A group may be present in either backend's table (or, transiently, in
//! both); its members are the union of both membership tables. Each
//! member's owning backend is derived from which user table holds it,
//! with the federated backend taking precedence.

use idbridge_core::GroupId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which backends currently hold a record for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GroupPresence {
    pub in_local: bool,
    pub in_federated: bool,
}

impl GroupPresence {
    /// Look up both group tables for `gid`.
    pub async fn find(pool: &sqlx::PgPool, gid: &GroupId) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT
                EXISTS (SELECT 1 FROM groups WHERE gid = $1) AS in_local,
                EXISTS (SELECT 1 FROM federated_groups WHERE gid = $1) AS in_federated
            ",
        )
        .bind(gid.as_str())
        .fetch_one(pool)
        .await
    }

    /// True when neither backend knows the group.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        !self.in_local && !self.in_federated
    }
}

/// A group member with the backends that hold its account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DirectoryMember {
    pub uid: String,
    pub is_local: bool,
    pub is_federated: bool,
}

impl DirectoryMember {
    /// List the members of `gid` across both membership tables.
    pub async fn list_for_group(
        pool: &sqlx::PgPool,
        gid: &GroupId,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT
                m.uid,
                (u.uid IS NOT NULL) AS is_local,
                (fu.uid IS NOT NULL) AS is_federated
            FROM (
                SELECT uid FROM group_user WHERE gid = $1
                UNION
                SELECT uid FROM federated_group_members WHERE gid = $1
            ) m
            LEFT JOIN users u ON u.uid = m.uid
            LEFT JOIN federated_users fu ON fu.uid = m.uid
            ORDER BY m.uid
            ",
        )
        .bind(gid.as_str())
        .fetch_all(pool)
        .await
    }
}
