//! Accounts provisioned by the federated identity backend.

use idbridge_core::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user created through single sign-on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FederatedUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub home: Option<String>,
}

impl FederatedUser {
    /// Create an account. Returns `false` when the uid already exists.
    pub async fn create(
        pool: &sqlx::PgPool,
        uid: &UserId,
        display_name: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            INSERT INTO federated_users (uid, display_name)
            VALUES ($1, $2)
            ON CONFLICT (uid) DO NOTHING
            ",
        )
        .bind(uid.as_str())
        .bind(display_name)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether the uid belongs to the federated backend.
    pub async fn exists(pool: &sqlx::PgPool, uid: &UserId) -> Result<bool, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            r"
            SELECT 1 FROM federated_users
            WHERE uid = $1
            ",
        )
        .bind(uid.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(row.is_some())
    }
}
