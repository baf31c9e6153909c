//! Storage traits for Flaps.

use std::future::Future;

use chrono::{DateTime, Utc};

use flaps_core::{
    Decision, Environment, EnvironmentId, Flag, FlagEnvironment, FlagId, FlagKey, Project,
    ProjectId, Segment, SegmentId, TenantId,
};

use crate::error::StorageResult;

// =============================================================================
// Workspace Integration (External API)
// =============================================================================

/// Client for interacting with the Nubster Workspace API.
///
/// Projects, tenants, and groups are managed by the Workspace service.
/// Flaps fetches this data via the Workspace API rather than storing it locally.
pub trait WorkspaceClient: Send + Sync {
    /// Gets a project by ID from Workspace.
    fn get_project(
        &self,
        id: ProjectId,
    ) -> impl Future<Output = StorageResult<Option<Project>>> + Send;

    /// Lists all projects accessible to the current tenant.
    fn list_projects(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = StorageResult<Vec<Project>>> + Send;

    /// Validates that a project exists and belongs to the tenant.
    fn validate_project_access(
        &self,
        tenant_id: TenantId,
        project_id: ProjectId,
    ) -> impl Future<Output = StorageResult<bool>> + Send;
}

// =============================================================================
// Local Repositories (Flaps-specific data)
// =============================================================================

/// Repository for flag operations.
pub trait FlagRepository: Send + Sync {
    /// Gets a flag by ID.
    fn get_by_id(&self, id: FlagId) -> impl Future<Output = StorageResult<Option<Flag>>> + Send;

    /// Gets a flag by key within a project.
    fn get_by_key(
        &self,
        project_id: ProjectId,
        key: &FlagKey,
    ) -> impl Future<Output = StorageResult<Option<Flag>>> + Send;

    /// Lists all flags in a project.
    fn list_by_project(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = StorageResult<Vec<Flag>>> + Send;

    /// Creates a new flag.
    fn create(&self, flag: &Flag) -> impl Future<Output = StorageResult<()>> + Send;

    /// Updates an existing flag.
    fn update(&self, flag: &Flag) -> impl Future<Output = StorageResult<()>> + Send;

    /// Deletes a flag.
    fn delete(&self, id: FlagId) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Repository for segment operations.
pub trait SegmentRepository: Send + Sync {
    /// Gets a segment by ID.
    fn get_by_id(
        &self,
        id: SegmentId,
    ) -> impl Future<Output = StorageResult<Option<Segment>>> + Send;

    /// Gets a segment by key within a project.
    fn get_by_key(
        &self,
        project_id: ProjectId,
        key: &str,
    ) -> impl Future<Output = StorageResult<Option<Segment>>> + Send;

    /// Lists all segments in a project.
    fn list_by_project(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = StorageResult<Vec<Segment>>> + Send;

    /// Creates a new segment.
    fn create(&self, segment: &Segment) -> impl Future<Output = StorageResult<()>> + Send;

    /// Updates an existing segment.
    fn update(&self, segment: &Segment) -> impl Future<Output = StorageResult<()>> + Send;

    /// Deletes a segment.
    fn delete(&self, id: SegmentId) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Repository for environment operations.
pub trait EnvironmentRepository: Send + Sync {
    /// Gets an environment by ID.
    fn get_by_id(
        &self,
        id: EnvironmentId,
    ) -> impl Future<Output = StorageResult<Option<Environment>>> + Send;

    /// Gets an environment by key within a project.
    fn get_by_key(
        &self,
        project_id: ProjectId,
        key: &str,
    ) -> impl Future<Output = StorageResult<Option<Environment>>> + Send;

    /// Lists all environments in a project.
    fn list_by_project(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = StorageResult<Vec<Environment>>> + Send;

    /// Creates a new environment.
    fn create(&self, environment: &Environment) -> impl Future<Output = StorageResult<()>> + Send;

    /// Updates an existing environment.
    fn update(&self, environment: &Environment) -> impl Future<Output = StorageResult<()>> + Send;

    /// Deletes an environment.
    fn delete(&self, id: EnvironmentId) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Repository for per-(flag, environment) overlays: the enabled bit, rollout
/// percentage, default variant, ordered rules, and scheduled transitions.
pub trait FlagEnvironmentRepository: Send + Sync {
    /// Gets the overlay for a flag in an environment, if one has been materialized.
    fn get(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
    ) -> impl Future<Output = StorageResult<Option<FlagEnvironment>>> + Send;

    /// Lists every overlay materialized for an environment.
    fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
    ) -> impl Future<Output = StorageResult<Vec<FlagEnvironment>>> + Send;

    /// Lists every overlay materialized for a flag, across all environments.
    fn list_by_flag(
        &self,
        flag_id: FlagId,
    ) -> impl Future<Output = StorageResult<Vec<FlagEnvironment>>> + Send;

    /// Lists every overlay with a scheduled `enable_at`/`disable_at` at or
    /// before `now`, across every project. Backs the durable scheduler's
    /// tick loop: schedules live on the overlay row itself, so they survive
    /// a process restart without a separate in-memory registration table.
    fn list_due(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StorageResult<Vec<FlagEnvironment>>> + Send;

    /// Creates the overlay row materialized when a flag is created.
    fn create(&self, overlay: &FlagEnvironment) -> impl Future<Output = StorageResult<()>> + Send;

    /// Upserts an overlay (toggle, rollout change, rule edit, schedule).
    fn upsert(&self, overlay: &FlagEnvironment) -> impl Future<Output = StorageResult<()>> + Send;

    /// Deletes the overlay for a flag in an environment.
    fn delete(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
    ) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Append-only sink for evaluation decisions, used for audit and debugging.
pub trait EvaluationLogRepository: Send + Sync {
    /// Appends one evaluation record. Failures here must never block serving
    /// a decision to the caller — implementations log and drop on overload.
    fn append(
        &self,
        flag_key: &FlagKey,
        environment_id: EnvironmentId,
        subject_id: &str,
        decision: &Decision,
        evaluated_at: DateTime<Utc>,
    ) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Schedules a flag environment's enable/disable transition for a future time.
///
/// Firing is idempotent: re-registering the same `(flag_id, environment_id,
/// fire_at)` triple must not produce duplicate transitions.
pub trait Scheduler: Send + Sync {
    /// Registers a scheduled transition.
    fn schedule(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
        fire_at: DateTime<Utc>,
        enable: bool,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Cancels a previously registered transition, if any.
    fn cancel(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
    ) -> impl Future<Output = StorageResult<()>> + Send;
}

/// A fact published whenever a flag environment overlay changes, for
/// downstream cache invalidation and SDK push notification.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub flag_id: FlagId,
    pub environment_id: EnvironmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Publish/subscribe bus for flag change notifications.
pub trait ChangeBus: Send + Sync {
    /// Publishes a change event to all subscribers.
    fn publish(&self, event: ChangeEvent) -> impl Future<Output = StorageResult<()>> + Send;
}

// =============================================================================
// Cache Layer
// =============================================================================

/// Cache for flag configurations.
pub trait FlagCache: Send + Sync {
    /// Gets cached flags for a project/environment.
    fn get(
        &self,
        project_id: ProjectId,
        environment: &str,
    ) -> impl Future<Output = StorageResult<Option<Vec<Flag>>>> + Send;

    /// Sets cached flags for a project/environment.
    fn set(
        &self,
        project_id: ProjectId,
        environment: &str,
        flags: &[Flag],
        ttl_secs: u64,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Invalidates cache for a project/environment.
    fn invalidate(
        &self,
        project_id: ProjectId,
        environment: Option<&str>,
    ) -> impl Future<Output = StorageResult<()>> + Send;
}
