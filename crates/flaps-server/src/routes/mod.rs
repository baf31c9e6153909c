//! HTTP wire adapters: the five external interfaces of the decision service.

pub mod decision;
pub mod sdk;
pub mod subscribe;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/flags/:flag_key", get(decision::get_decision))
        .route("/evaluations/bulk", post(decision::post_bulk_decision))
        .route("/sdk/bootstrap", get(sdk::get_bootstrap))
        .route("/sdk/evaluate", post(sdk::post_sdk_evaluate))
        .route("/projects/:project/subscribe", get(subscribe::subscribe))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
