//! Groups owned by the federated identity backend.

use idbridge_core::GroupId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A group provisioned through single sign-on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FederatedGroup {
    pub id: i64,
    pub gid: String,
    pub display_name: Option<String>,
    /// Group name as asserted by the identity provider, when known.
    pub federated_gid: Option<String>,
}

impl FederatedGroup {
    /// Find a group by id.
    pub async fn find(pool: &sqlx::PgPool, gid: &GroupId) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT id, gid, display_name, federated_gid FROM federated_groups
            WHERE gid = $1
            ",
        )
        .bind(gid.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Create a group. Returns `false` when the gid already exists.
    ///
    /// Takes any executor so creation can join an open transaction.
    pub async fn create<'e, E>(executor: E, gid: &GroupId) -> Result<bool, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            INSERT INTO federated_groups (gid, display_name)
            VALUES ($1, $1)
            ON CONFLICT (gid) DO NOTHING
            ",
        )
        .bind(gid.as_str())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
