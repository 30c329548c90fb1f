//! Per-app key/value configuration entries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single configuration value, scoped by app id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AppConfigValue {
    pub app_id: String,
    pub config_key: String,
    pub config_value: String,
}

impl AppConfigValue {
    /// Read a value, `None` when the key was never written.
    pub async fn get(
        pool: &sqlx::PgPool,
        app_id: &str,
        config_key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            r"
            SELECT config_value FROM app_config
            WHERE app_id = $1 AND config_key = $2
            ",
        )
        .bind(app_id)
        .bind(config_key)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Insert or overwrite a value.
    pub async fn set(
        pool: &sqlx::PgPool,
        app_id: &str,
        config_key: &str,
        config_value: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO app_config (app_id, config_key, config_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (app_id, config_key) DO UPDATE SET config_value = EXCLUDED.config_value
            ",
        )
        .bind(app_id)
        .bind(config_key)
        .bind(config_value)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Remove a value. Returns whether a row existed.
    pub async fn delete(
        pool: &sqlx::PgPool,
        app_id: &str,
        config_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            DELETE FROM app_config
            WHERE app_id = $1 AND config_key = $2
            ",
        )
        .bind(app_id)
        .bind(config_key)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
