//! SQLite repository implementations.
//!
//! SQLite is used for:
//! - Local development
//! - On-premise single-node deployments
//! - Testing

mod environments;
mod flag_environments;
mod flags;
mod segments;

pub use environments::SqliteEnvironmentRepository;
pub use flag_environments::SqliteFlagEnvironmentRepository;
pub use flags::SqliteFlagRepository;
pub use segments::SqliteSegmentRepository;

use chrono::Utc;
use sqlx::{Pool, Sqlite};

use flaps_core::{FlagEnvironment, FlagId};

use crate::error::{StorageError, StorageResult};
use crate::traits::FlagEnvironmentRepository;

/// SQLite repositories bundle.
#[derive(Debug, Clone)]
pub struct SqliteRepositories {
    pub flags: SqliteFlagRepository,
    pub segments: SqliteSegmentRepository,
    pub environments: SqliteEnvironmentRepository,
    pub flag_environments: SqliteFlagEnvironmentRepository,
    pool: Pool<Sqlite>,
}

impl SqliteRepositories {
    /// Creates a new set of SQLite repositories.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            flags: SqliteFlagRepository::new(pool.clone()),
            segments: SqliteSegmentRepository::new(pool.clone()),
            environments: SqliteEnvironmentRepository::new(pool.clone()),
            flag_environments: SqliteFlagEnvironmentRepository::new(pool.clone()),
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

        let result = sqlx::query("UPDATE flags SET archived = ?, updated_at = ? WHERE id = ?")
            .bind(true)
            .bind(now)
            .bind(flag_id.0.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Flag", "id", flag_id.0.to_string()));
        }

        sqlx::query("UPDATE flag_environments SET enabled = ?, updated_at = ? WHERE flag_id = ?")
            .bind(false)
            .bind(now)
            .bind(flag_id.0.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.flag_environments.list_by_flag(flag_id).await
    }
}
