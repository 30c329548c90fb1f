//! Groups owned by the local database backend.

use idbridge_core::GroupId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the local `groups` table. Its existence means the group is
/// served by the database backend.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LegacyGroup {
    pub gid: String,
    pub display_name: Option<String>,
}

impl LegacyGroup {
    /// Find a group by id.
    pub async fn find(pool: &sqlx::PgPool, gid: &GroupId) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT gid, display_name FROM groups
            WHERE gid = $1
            ",
        )
        .bind(gid.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Create a group. Returns `false` when the gid is taken.
    pub async fn create(
        pool: &sqlx::PgPool,
        gid: &GroupId,
        display_name: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            INSERT INTO groups (gid, display_name)
            VALUES ($1, $2)
            ON CONFLICT (gid) DO NOTHING
            ",
        )
        .bind(gid.as_str())
        .bind(display_name)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a group record, returning the number of rows removed.
    ///
    /// Takes any executor so the delete can join an open transaction.
    pub async fn delete<'e, E>(executor: E, gid: &GroupId) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            DELETE FROM groups
            WHERE gid = $1
            ",
        )
        .bind(gid.as_str())
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
