//! Membership rows of the local database backend (`group_user`).

use idbridge_core::{GroupId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's membership in a database-backed group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LegacyGroupMember {
    pub gid: String,
    pub uid: String,
}

impl LegacyGroupMember {
    /// List the member uids of a group.
    pub async fn list_uids(pool: &sqlx::PgPool, gid: &GroupId) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT uid FROM group_user
            WHERE gid = $1
            ORDER BY uid
            ",
        )
        .bind(gid.as_str())
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(uid,)| uid).collect())
    }

    /// Add a user to a group.
    pub async fn add(pool: &sqlx::PgPool, gid: &GroupId, uid: &UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            INSERT INTO group_user (gid, uid)
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

    /// Remove every membership row of a group.
    pub async fn delete_for_group(pool: &sqlx::PgPool, gid: &GroupId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            DELETE FROM group_user
            WHERE gid = $1
            ",
        )
        .bind(gid.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
