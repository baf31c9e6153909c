//! PostgreSQL flag-environment overlay repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use flaps_core::{EnvironmentId, FlagEnvironment, FlagId, FlagRule};

use crate::error::{StorageError, StorageResult};
use crate::traits::FlagEnvironmentRepository;

/// PostgreSQL implementation of the flag-environment overlay repository.
#[derive(Debug, Clone)]
pub struct PostgresFlagEnvironmentRepository {
    pool: Pool<Postgres>,
}

impl PostgresFlagEnvironmentRepository {
    /// Creates a new PostgreSQL flag-environment repository.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

impl FlagEnvironmentRepository for PostgresFlagEnvironmentRepository {
    async fn get(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
    ) -> StorageResult<Option<FlagEnvironment>> {
        let row = sqlx::query(
            r#"
            SELECT flag_id, environment_id, enabled, percentage, default_variant, rules,
                   enable_at, disable_at, metadata, created_at, updated_at
            FROM flag_environments
            WHERE flag_id = $1 AND environment_id = $2
            "#,
        )
        .bind(flag_id.0.to_string())
        .bind(environment_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_overlay(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
    ) -> StorageResult<Vec<FlagEnvironment>> {
        let rows = sqlx::query(
            r#"
            SELECT flag_id, environment_id, enabled, percentage, default_variant, rules,
                   enable_at, disable_at, metadata, created_at, updated_at
            FROM flag_environments
            WHERE environment_id = $1
            "#,
        )
        .bind(environment_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_overlay).collect()
    }

    async fn list_by_flag(&self, flag_id: FlagId) -> StorageResult<Vec<FlagEnvironment>> {
        let rows = sqlx::query(
            r#"
            SELECT flag_id, environment_id, enabled, percentage, default_variant, rules,
                   enable_at, disable_at, metadata, created_at, updated_at
            FROM flag_environments
            WHERE flag_id = $1
            "#,
        )
        .bind(flag_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_overlay).collect()
    }

    async fn list_due(&self, now: DateTime<Utc>) -> StorageResult<Vec<FlagEnvironment>> {
        let rows = sqlx::query(
            r#"
            SELECT flag_id, environment_id, enabled, percentage, default_variant, rules,
                   enable_at, disable_at, metadata, created_at, updated_at
            FROM flag_environments
            WHERE (enable_at IS NOT NULL AND enable_at <= $1)
               OR (disable_at IS NOT NULL AND disable_at <= $1)
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_overlay).collect()
    }

    async fn create(&self, overlay: &FlagEnvironment) -> StorageResult<()> {
        let rules_json = serde_json::to_string(&overlay.rules)?;

        let result = sqlx::query(
            r#"
            INSERT INTO flag_environments (flag_id, environment_id, enabled, percentage,
                default_variant, rules, enable_at, disable_at, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(overlay.flag_id.0.to_string())
        .bind(overlay.environment_id.0.to_string())
        .bind(overlay.enabled)
        .bind(overlay.percentage as i16)
        .bind(&overlay.default_variant)
        .bind(rules_json)
        .bind(overlay.enable_at)
        .bind(overlay.disable_at)
        .bind(&overlay.metadata)
        .bind(overlay.created_at)
        .bind(overlay.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StorageError::duplicate(
                    "FlagEnvironment",
                    "flag_id/environment_id",
                    format!("{}/{}", overlay.flag_id, overlay.environment_id),
                ))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert(&self, overlay: &FlagEnvironment) -> StorageResult<()> {
        let rules_json = serde_json::to_string(&overlay.rules)?;

        sqlx::query(
            r#"
            INSERT INTO flag_environments (flag_id, environment_id, enabled, percentage,
                default_variant, rules, enable_at, disable_at, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (flag_id, environment_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                percentage = EXCLUDED.percentage,
                default_variant = EXCLUDED.default_variant,
                rules = EXCLUDED.rules,
                enable_at = EXCLUDED.enable_at,
                disable_at = EXCLUDED.disable_at,
                metadata = EXCLUDED.metadata,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(overlay.flag_id.0.to_string())
        .bind(overlay.environment_id.0.to_string())
        .bind(overlay.enabled)
        .bind(overlay.percentage as i16)
        .bind(&overlay.default_variant)
        .bind(rules_json)
        .bind(overlay.enable_at)
        .bind(overlay.disable_at)
        .bind(&overlay.metadata)
        .bind(overlay.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, flag_id: FlagId, environment_id: EnvironmentId) -> StorageResult<()> {
        let result = sqlx::query(
            "DELETE FROM flag_environments WHERE flag_id = $1 AND environment_id = $2",
        )
        .bind(flag_id.0.to_string())
        .bind(environment_id.0.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(
                "FlagEnvironment",
                "flag_id/environment_id",
                format!("{}/{}", flag_id, environment_id),
            ));
        }

        Ok(())
    }
}

fn row_to_overlay(row: &sqlx::postgres::PgRow) -> StorageResult<FlagEnvironment> {
    let flag_id: String = row.try_get("flag_id")?;
    let environment_id: String = row.try_get("environment_id")?;
    let enabled: bool = row.try_get("enabled")?;
    let percentage: i16 = row.try_get("percentage")?;
    let default_variant: Option<String> = row.try_get("default_variant")?;
    let rules_json: Option<String> = row.try_get("rules")?;
    let enable_at: Option<DateTime<Utc>> = row.try_get("enable_at")?;
    let disable_at: Option<DateTime<Utc>> = row.try_get("disable_at")?;
    let metadata: serde_json::Value = row.try_get("metadata")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let rules: Vec<FlagRule> = rules_json
        .map(|j| serde_json::from_str(&j))
        .transpose()?
        .unwrap_or_default();

    Ok(FlagEnvironment {
        flag_id: FlagId::from_uuid(Uuid::parse_str(&flag_id).map_err(|e| {
            StorageError::Configuration(format!("Invalid UUID in database: {}", e))
        })?),
        environment_id: EnvironmentId::from_uuid(Uuid::parse_str(&environment_id).map_err(
            |e| StorageError::Configuration(format!("Invalid UUID in database: {}", e)),
        )?),
        enabled,
        percentage: percentage as u8,
        default_variant,
        rules,
        enable_at,
        disable_at,
        metadata,
        created_at,
        updated_at,
    })
}
