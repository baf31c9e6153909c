//! SDK Bootstrap and SDK Fast Evaluate, both authenticated by `X-SDK-Key`.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flaps_core::{Environment, Flag, FlagEnvironment};

use crate::error::AppError;
use crate::routes::decision::DecisionResponse;
use crate::state::{ActorContext, AppState};

#[derive(Debug, Deserialize)]
pub struct BootstrapQuery {
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub environment: String,
    pub flags: Vec<Flag>,
    pub overlays: Vec<FlagEnvironment>,
    pub server_time: DateTime<Utc>,
}

/// `GET /sdk/bootstrap?environment=…` — the project-env snapshot an SDK
/// needs to evaluate flags locally: every flag definition plus its overlay
/// for the requested environment.
pub async fn get_bootstrap(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(query): Query<BootstrapQuery>,
) -> Result<Json<BootstrapResponse>, AppError> {
    let environment: Environment = state
        .repos()
        .get_environment_by_key(actor.project_id, &query.environment)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("unknown environment: {}", query.environment)))?;

    let flags = state.flags_for(actor.project_id, &query.environment).await?;
    let overlays = state.repos().list_overlays(environment.id).await?;

    Ok(Json(BootstrapResponse {
        environment: query.environment,
        flags,
        overlays,
        server_time: Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SdkEvaluateRequest {
    pub flag: String,
    pub environment: String,
    #[serde(default)]
    pub context: flaps_core::EvaluationContext,
}

/// `POST /sdk/evaluate { flag, environment, context }` — identical payload
/// to the Decision RPC, authenticated by `X-SDK-Key` instead of a bearer
/// token. Never logged (SDKs poll/stream for config, not per-decision audit).
pub async fn post_sdk_evaluate(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(request): Json<SdkEvaluateRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let flag_key = flaps_core::FlagKey::try_new(&request.flag)
        .ok_or_else(|| AppError::BadRequest(format!("invalid flag key: {}", request.flag)))?;

    let flags = state.flags_for(actor.project_id, &request.environment).await?;
    let flag = flags.into_iter().find(|f| f.key == flag_key);
    let Some(flag) = flag else {
        return Ok(Json(DecisionResponse {
            key: request.flag,
            enabled: false,
            variant: None,
            reason: flaps_core::EvaluationReason::FlagNotFound.as_wire_str(),
        }));
    };

    let environment = state
        .repos()
        .get_environment_by_key(actor.project_id, &request.environment)
        .await?;
    let overlay = match &environment {
        Some(env) => state.repos().get_overlay(flag.id, env.id).await?,
        None => None,
    };

    let evaluator = state.evaluator_for(actor.project_id).await?;
    let decision = evaluator.evaluate(&flag, overlay.as_ref(), &request.context);

    Ok(Json(DecisionResponse {
        key: flag_key.as_str().to_string(),
        enabled: decision.enabled,
        variant: decision.variant,
        reason: decision.reason.as_wire_str(),
    }))
}
