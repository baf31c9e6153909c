//! PostgreSQL repository implementations.

mod environments;
mod flag_environments;
mod flags;
mod segments;

pub use environments::PostgresEnvironmentRepository;
pub use flag_environments::PostgresFlagEnvironmentRepository;
pub use flags::PostgresFlagRepository;
pub use segments::PostgresSegmentRepository;

use chrono::Utc;
use sqlx::{Pool, Postgres};

use flaps_core::{FlagEnvironment, FlagId};

use crate::error::{StorageError, StorageResult};
use crate::traits::FlagEnvironmentRepository;

/// PostgreSQL repositories bundle.
#[derive(Debug, Clone)]
pub struct PostgresRepositories {
    pub flags: PostgresFlagRepository,
    pub segments: PostgresSegmentRepository,
    pub environments: PostgresEnvironmentRepository,
    pub flag_environments: PostgresFlagEnvironmentRepository,
    pool: Pool<Postgres>,
}

impl PostgresRepositories {
    /// Creates a new set of PostgreSQL repositories.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            flags: PostgresFlagRepository::new(pool.clone()),
            segments: PostgresSegmentRepository::new(pool.clone()),
            environments: PostgresEnvironmentRepository::new(pool.clone()),
            flag_environments: PostgresFlagEnvironmentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Archives a flag: forces `enabled = false` across every overlay for
    /// this flag in the same transaction as the flag's `archived` bit,
    /// so a reader never observes an archived flag still serving `true`.
    ///
    /// Returns the overlays affected by the cascade, for change-event fan-out.
    pub async fn archive(&self, flag_id: FlagId) -> StorageResult<Vec<FlagEnvironment>> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query("UPDATE flags SET archived = $2, updated_at = $3 WHERE id = $1")
            .bind(flag_id.0.to_string())
            .bind(true)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Flag", "id", flag_id.0.to_string()));
        }

        sqlx::query(
            "UPDATE flag_environments SET enabled = $2, updated_at = $3 WHERE flag_id = $1",
        )
        .bind(flag_id.0.to_string())
        .bind(false)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.flag_environments.list_by_flag(flag_id).await
    }
}
