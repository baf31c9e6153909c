//! Shared application state and the pass-through authentication extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use flaps_core::{Evaluator, Flag, ProjectId, Segment};
use flaps_storage::{
    DatabaseConfig, FlagCache, InMemoryChangeBus, RedisCacheConfig, RedisFlagCache, Repositories,
    StorageResult, StorageScheduler, TracingEvaluationLog,
};

use crate::config::ServerConfig;
use crate::error::AppError;

struct Inner {
    repos: Repositories,
    cache: Option<RedisFlagCache>,
    scheduler: StorageScheduler,
    eval_log: TracingEvaluationLog,
    cache_ttl_secs: u64,
}

/// Application state shared across handlers, cheap to clone (an `Arc` inside).
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub async fn build(config: &ServerConfig) -> anyhow::Result<Self> {
        let database_config = DatabaseConfig {
            url: config.database_url.clone(),
            ..DatabaseConfig::default()
        };
        let change_bus = InMemoryChangeBus::new(config.change_bus_capacity);
        let repos = Repositories::connect(&database_config, change_bus).await?;

        let cache = match &config.cache_url {
            Some(url) => Some(RedisFlagCache::new(RedisCacheConfig::new(url.clone())).await?),
            None => None,
        };

        let scheduler = StorageScheduler::new(repos.clone());
        scheduler.spawn_tick_loop(std::time::Duration::from_secs(config.scheduler_tick_secs));

        Ok(Self(Arc::new(Inner {
            repos,
            cache,
            scheduler,
            eval_log: TracingEvaluationLog,
            cache_ttl_secs: config.cache_ttl_secs,
        })))
    }

    pub fn repos(&self) -> &Repositories {
        &self.0.repos
    }

    pub fn cache(&self) -> Option<&RedisFlagCache> {
        self.0.cache.as_ref()
    }

    pub fn change_bus(&self) -> &InMemoryChangeBus {
        self.0.repos.change_bus()
    }

    pub fn scheduler(&self) -> &StorageScheduler {
        &self.0.scheduler
    }

    pub fn eval_log(&self) -> &TracingEvaluationLog {
        &self.0.eval_log
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.0.cache_ttl_secs
    }

    /// Builds an evaluator loaded with every segment defined for the project.
    ///
    /// Segments are small and change rarely; loading them per decision keeps
    /// the server stateless with respect to segment membership instead of
    /// maintaining a separately-invalidated in-process segment cache.
    pub async fn evaluator_for(&self, project_id: ProjectId) -> StorageResult<Evaluator> {
        let segments: Vec<Segment> = self.0.repos.list_segments(project_id).await?;
        Ok(Evaluator::with_segments(segments))
    }

    /// Reads the flag list for a project/environment through the cache,
    /// falling back to storage on a miss and repopulating the cache.
    /// Every real request path (decision, bulk, bootstrap, SDK evaluate)
    /// should call this instead of `repos().list_flags()` directly.
    pub async fn flags_for(
        &self,
        project_id: ProjectId,
        environment: &str,
    ) -> StorageResult<Vec<Flag>> {
        let Some(cache) = self.cache() else {
            return self.0.repos.list_flags(project_id).await;
        };

        if let Some(cached) = cache.get(project_id, environment).await? {
            return Ok(cached);
        }

        let flags = self.0.repos.list_flags(project_id).await?;
        cache.set(project_id, environment, &flags, self.cache_ttl_secs()).await?;
        Ok(flags)
    }
}

/// An opaque, unvalidated `(project_id, credential)` pair extracted from the
/// request's auth header. Credential *validation* is an external
/// collaborator (the Workspace API for admin bearer tokens, a project-key
/// service for `X-SDK-Key`); this extractor only decodes the project id the
/// credential carries and passes the raw value through.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub project_id: ProjectId,
    pub credential: String,
}

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(sdk_key) = parts.headers.get("x-sdk-key") {
            let raw = sdk_key.to_str().map_err(|_| AppError::Unauthorized)?;
            return Ok(Self {
                project_id: parse_project_id(raw)?,
                credential: raw.to_string(),
            });
        }

        if let Some(auth) = parts.headers.get(AUTHORIZATION) {
            let raw = auth.to_str().map_err(|_| AppError::Unauthorized)?;
            let token = raw.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
            return Ok(Self {
                project_id: parse_project_id(token)?,
                credential: token.to_string(),
            });
        }

        Err(AppError::Unauthorized)
    }
}

fn parse_project_id(raw: &str) -> Result<ProjectId, AppError> {
    raw.parse::<Uuid>()
        .map(ProjectId::from_uuid)
        .map_err(|_| AppError::Unauthorized)
}
