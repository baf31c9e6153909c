//! Backend-agnostic repository bundle.
//!
//! [`FlagRepository`] and its siblings return `impl Future`, which isn't
//! object-safe, so a caller that must stay generic over the configured
//! backend (the HTTP server, the CLI) can't hold a `dyn` trait object.
//! This enum dispatches by hand instead, mirroring how [`crate::db::Database`]
//! already picks between a `Pool<Postgres>` and a `Pool<Sqlite>`.

use chrono::{DateTime, Utc};

use flaps_core::{
    Environment, EnvironmentId, Flag, FlagEnvironment, FlagId, FlagKey, ProjectId, Segment,
    SegmentId,
};

use crate::db::postgres::PostgresRepositories;
use crate::db::sqlite::SqliteRepositories;
use crate::db::{Database, DatabaseConfig};
use crate::error::StorageResult;
use crate::memory::InMemoryChangeBus;
use crate::traits::{
    ChangeBus, ChangeEvent, EnvironmentRepository, FlagEnvironmentRepository, FlagRepository,
    SegmentRepository,
};

/// Either a PostgreSQL or SQLite repository bundle.
#[derive(Debug, Clone)]
enum Backend {
    Postgres(PostgresRepositories),
    Sqlite(SqliteRepositories),
}

/// The full storage surface: a backend bundle plus the change bus that
/// overlay mutations publish to. Bundled together so that every write
/// path that touches a [`FlagEnvironment`] fans out a [`ChangeEvent`]
/// without every caller (CLI, HTTP routes, the scheduler) remembering to.
#[derive(Debug, Clone)]
pub struct Repositories {
    backend: Backend,
    change_bus: InMemoryChangeBus,
}

impl Repositories {
    /// Connects and builds the repository bundle matching the configured backend.
    pub async fn connect(config: &DatabaseConfig, change_bus: InMemoryChangeBus) -> StorageResult<Self> {
        let backend = match Database::connect(config).await? {
            Database::Postgres(pool) => Backend::Postgres(PostgresRepositories::new(pool)),
            Database::Sqlite(pool) => Backend::Sqlite(SqliteRepositories::new(pool)),
        };
        Ok(Self { backend, change_bus })
    }

    /// The change bus this bundle publishes overlay mutations to. Subscribe
    /// to drive the SSE push path or a scheduler's re-evaluation loop.
    pub fn change_bus(&self) -> &InMemoryChangeBus {
        &self.change_bus
    }

    async fn publish(&self, flag_id: FlagId, environment_id: EnvironmentId) {
        let event = ChangeEvent {
            flag_id,
            environment_id,
            occurred_at: Utc::now(),
        };
        if let Err(err) = self.change_bus.publish(event).await {
            tracing::warn!(error = %err, "failed to publish change event");
        }
    }

    pub async fn get_flag_by_id(&self, id: FlagId) -> StorageResult<Option<Flag>> {
        match &self.backend {
            Backend::Postgres(r) => r.flags.get_by_id(id).await,
            Backend::Sqlite(r) => r.flags.get_by_id(id).await,
        }
    }

    pub async fn get_flag_by_key(
        &self,
        project_id: ProjectId,
        key: &FlagKey,
    ) -> StorageResult<Option<Flag>> {
        match &self.backend {
            Backend::Postgres(r) => r.flags.get_by_key(project_id, key).await,
            Backend::Sqlite(r) => r.flags.get_by_key(project_id, key).await,
        }
    }

    pub async fn list_flags(&self, project_id: ProjectId) -> StorageResult<Vec<Flag>> {
        match &self.backend {
            Backend::Postgres(r) => r.flags.list_by_project(project_id).await,
            Backend::Sqlite(r) => r.flags.list_by_project(project_id).await,
        }
    }

    pub async fn create_flag(&self, flag: &Flag) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.flags.create(flag).await,
            Backend::Sqlite(r) => r.flags.create(flag).await,
        }
    }

    pub async fn update_flag(&self, flag: &Flag) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.flags.update(flag).await,
            Backend::Sqlite(r) => r.flags.update(flag).await,
        }
    }

    pub async fn delete_flag(&self, id: FlagId) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.flags.delete(id).await,
            Backend::Sqlite(r) => r.flags.delete(id).await,
        }
    }

    /// Archives a flag: forces `enabled = false` across every environment
    /// for this flag in a single transaction, then publishes a change event
    /// per affected overlay so subscribers and caches pick up the cascade.
    pub async fn archive_flag(&self, id: FlagId) -> StorageResult<()> {
        let affected = match &self.backend {
            Backend::Postgres(r) => r.archive(id).await?,
            Backend::Sqlite(r) => r.archive(id).await?,
        };
        for overlay in affected {
            self.publish(overlay.flag_id, overlay.environment_id).await;
        }
        Ok(())
    }

    pub async fn get_segment_by_id(&self, id: SegmentId) -> StorageResult<Option<Segment>> {
        match &self.backend {
            Backend::Postgres(r) => r.segments.get_by_id(id).await,
            Backend::Sqlite(r) => r.segments.get_by_id(id).await,
        }
    }

    pub async fn list_segments(&self, project_id: ProjectId) -> StorageResult<Vec<Segment>> {
        match &self.backend {
            Backend::Postgres(r) => r.segments.list_by_project(project_id).await,
            Backend::Sqlite(r) => r.segments.list_by_project(project_id).await,
        }
    }

    pub async fn create_segment(&self, segment: &Segment) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.segments.create(segment).await,
            Backend::Sqlite(r) => r.segments.create(segment).await,
        }
    }

    pub async fn update_segment(&self, segment: &Segment) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.segments.update(segment).await,
            Backend::Sqlite(r) => r.segments.update(segment).await,
        }
    }

    pub async fn delete_segment(&self, id: SegmentId) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.segments.delete(id).await,
            Backend::Sqlite(r) => r.segments.delete(id).await,
        }
    }

    pub async fn get_environment_by_id(&self, id: EnvironmentId) -> StorageResult<Option<Environment>> {
        match &self.backend {
            Backend::Postgres(r) => r.environments.get_by_id(id).await,
            Backend::Sqlite(r) => r.environments.get_by_id(id).await,
        }
    }

    pub async fn get_environment_by_key(
        &self,
        project_id: ProjectId,
        key: &str,
    ) -> StorageResult<Option<Environment>> {
        match &self.backend {
            Backend::Postgres(r) => r.environments.get_by_key(project_id, key).await,
            Backend::Sqlite(r) => r.environments.get_by_key(project_id, key).await,
        }
    }

    pub async fn list_environments(&self, project_id: ProjectId) -> StorageResult<Vec<Environment>> {
        match &self.backend {
            Backend::Postgres(r) => r.environments.list_by_project(project_id).await,
            Backend::Sqlite(r) => r.environments.list_by_project(project_id).await,
        }
    }

    pub async fn create_environment(&self, environment: &Environment) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.environments.create(environment).await,
            Backend::Sqlite(r) => r.environments.create(environment).await,
        }
    }

    pub async fn delete_environment(&self, id: EnvironmentId) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.environments.delete(id).await,
            Backend::Sqlite(r) => r.environments.delete(id).await,
        }
    }

    pub async fn get_overlay(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
    ) -> StorageResult<Option<FlagEnvironment>> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.get(flag_id, environment_id).await,
            Backend::Sqlite(r) => r.flag_environments.get(flag_id, environment_id).await,
        }
    }

    pub async fn list_overlays(&self, environment_id: EnvironmentId) -> StorageResult<Vec<FlagEnvironment>> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.list_by_environment(environment_id).await,
            Backend::Sqlite(r) => r.flag_environments.list_by_environment(environment_id).await,
        }
    }

    pub async fn list_overlays_by_flag(&self, flag_id: FlagId) -> StorageResult<Vec<FlagEnvironment>> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.list_by_flag(flag_id).await,
            Backend::Sqlite(r) => r.flag_environments.list_by_flag(flag_id).await,
        }
    }

    /// Lists every overlay with a due `enable_at`/`disable_at`, across all
    /// projects. Polled by [`crate::scheduler::StorageScheduler`]'s tick loop.
    pub async fn list_overlays_due(&self, now: DateTime<Utc>) -> StorageResult<Vec<FlagEnvironment>> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.list_due(now).await,
            Backend::Sqlite(r) => r.flag_environments.list_due(now).await,
        }
    }

    pub async fn create_overlay(&self, overlay: &FlagEnvironment) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.create(overlay).await,
            Backend::Sqlite(r) => r.flag_environments.create(overlay).await,
        }?;
        self.publish(overlay.flag_id, overlay.environment_id).await;
        Ok(())
    }

    pub async fn upsert_overlay(&self, overlay: &FlagEnvironment) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.upsert(overlay).await,
            Backend::Sqlite(r) => r.flag_environments.upsert(overlay).await,
        }?;
        self.publish(overlay.flag_id, overlay.environment_id).await;
        Ok(())
    }

    pub async fn delete_overlay(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
    ) -> StorageResult<()> {
        match &self.backend {
            Backend::Postgres(r) => r.flag_environments.delete(flag_id, environment_id).await,
            Backend::Sqlite(r) => r.flag_environments.delete(flag_id, environment_id).await,
        }?;
        self.publish(flag_id, environment_id).await;
        Ok(())
    }
}
