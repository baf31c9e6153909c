//! Decision RPC and Bulk Decision.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use flaps_core::{Decision, EvaluationContext, Evaluator, Flag, FlagKey};

use crate::error::AppError;
use crate::state::{ActorContext, AppState};

#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    pub environment: String,
    /// JSON-encoded [`EvaluationContext`].
    pub context: Option<String>,
    #[serde(default)]
    pub log: bool,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub key: String,
    pub enabled: bool,
    pub variant: Option<String>,
    pub reason: String,
}

impl DecisionResponse {
    fn from_decision(key: &str, decision: Decision) -> Self {
        Self {
            key: key.to_string(),
            enabled: decision.enabled,
            variant: decision.variant,
            reason: decision.reason.as_wire_str(),
        }
    }
}

fn parse_context(raw: Option<&str>) -> Result<EvaluationContext, AppError> {
    match raw {
        None => Ok(EvaluationContext::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("invalid context: {e}"))),
    }
}

/// `GET /flags/{flag_key}?environment={env}&context={json}&log={true|false}`
///
/// Flag-not-found and flag-disabled both degrade to a 200 decision; they
/// are never surfaced as HTTP errors on this path (§7).
pub async fn get_decision(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(flag_key): Path<String>,
    Query(query): Query<DecisionQuery>,
) -> Result<Json<DecisionResponse>, AppError> {
    let flag_key = FlagKey::try_new(&flag_key)
        .ok_or_else(|| AppError::BadRequest(format!("invalid flag key: {flag_key}")))?;
    let context = parse_context(query.context.as_deref())?;

    let decision = evaluate_one(&state, &actor, &flag_key, &query.environment, &context).await?;

    if query.log {
        log_decision(&state, actor.project_id, &flag_key, &query.environment, &context, &decision).await;
    }

    Ok(Json(DecisionResponse::from_decision(flag_key.as_str(), decision)))
}

#[derive(Debug, Deserialize)]
pub struct BulkDecisionRequest {
    pub environment: String,
    #[serde(default)]
    pub context: EvaluationContext,
}

#[derive(Debug, Serialize)]
pub struct BulkDecisionResponse {
    pub flags: Vec<DecisionResponse>,
}

/// `POST /evaluations/bulk { environment, context }` — every non-archived
/// flag in the project, evaluated once. Bulk decisions are never logged
/// individually (§8: single logs by default, bulk does not).
pub async fn post_bulk_decision(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(request): Json<BulkDecisionRequest>,
) -> Result<Json<BulkDecisionResponse>, AppError> {
    let environment = state
        .repos()
        .get_environment_by_key(actor.project_id, &request.environment)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("unknown environment: {}", request.environment)))?;
    let flags = state.flags_for(actor.project_id, &request.environment).await?;
    let evaluator = state.evaluator_for(actor.project_id).await?;

    let mut results = Vec::with_capacity(flags.len());
    for flag in flags.into_iter().filter(|f| !f.archived) {
        let overlay = state.repos().get_overlay(flag.id, environment.id).await?;
        let decision = evaluator.evaluate(&flag, overlay.as_ref(), &request.context);
        results.push(DecisionResponse::from_decision(flag.key.as_str(), decision));
    }

    Ok(Json(BulkDecisionResponse { flags: results }))
}

async fn evaluate_one(
    state: &AppState,
    actor: &ActorContext,
    flag_key: &FlagKey,
    environment_key: &str,
    context: &EvaluationContext,
) -> Result<Decision, AppError> {
    let environment = state
        .repos()
        .get_environment_by_key(actor.project_id, environment_key)
        .await?;
    let Some(environment) = environment else {
        return Ok(flag_not_found_decision());
    };

    let flags = state.flags_for(actor.project_id, environment_key).await?;
    let Some(flag): Option<Flag> = flags.into_iter().find(|f| &f.key == flag_key) else {
        return Ok(flag_not_found_decision());
    };

    let overlay = state.repos().get_overlay(flag.id, environment.id).await?;
    let evaluator: Evaluator = state.evaluator_for(actor.project_id).await?;
    Ok(evaluator.evaluate(&flag, overlay.as_ref(), context))
}

fn flag_not_found_decision() -> Decision {
    Decision {
        enabled: false,
        variant: None,
        reason: flaps_core::EvaluationReason::FlagNotFound,
        rule_id: None,
    }
}

async fn log_decision(
    state: &AppState,
    project_id: flaps_core::ProjectId,
    flag_key: &FlagKey,
    environment_key: &str,
    context: &EvaluationContext,
    decision: &Decision,
) {
    use flaps_storage::EvaluationLogRepository;

    let Ok(Some(environment)) = state.repos().get_environment_by_key(project_id, environment_key).await
    else {
        return;
    };

    let subject = context.resolve_subject_id();
    if let Err(e) = state
        .eval_log()
        .append(flag_key, environment.id, &subject, decision, chrono::Utc::now())
        .await
    {
        tracing::warn!(error = %e, "failed to append evaluation log, dropping");
    }
}
