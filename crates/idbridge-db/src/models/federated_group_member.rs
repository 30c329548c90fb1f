//! Membership rows of the federated identity backend.

use idbridge_core::{GroupId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's membership in a federated group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FederatedGroupMember {
    pub gid: String,
    pub uid: String,
}

impl FederatedGroupMember {
    /// Add a user to a group. Returns `false` if the row already existed.
    pub async fn add(pool: &sqlx::PgPool, gid: &GroupId, uid: &UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            INSERT INTO federated_group_members (gid, uid)
            VALUES ($1, $2)
            ON CONFLICT (gid, uid) DO NOTHING
            ",
        )
        .bind(gid.as_str())
        .bind(uid.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List the member uids of a group.
    pub async fn list_uids(pool: &sqlx::PgPool, gid: &GroupId) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT uid FROM federated_group_members
            WHERE gid = $1
            ORDER BY uid
            ",
        )
        .bind(gid.as_str())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(uid,)| uid).collect())
    }
}
