//! SSE subscribe stream over the in-process change bus.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde::Serialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use flaps_core::ProjectId;

use crate::state::{ActorContext, AppState};

#[derive(Debug, Serialize)]
struct ChangeFrame {
    action: &'static str,
    flag_key: String,
    environment: String,
    enabled: bool,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// `GET /projects/{project}/subscribe` — a server-sent-events stream of
/// [`flaps_storage::ChangeEvent`]s for the given project, resolved into the
/// wire frame shape and filtered to events belonging to that project.
///
/// `ChangeEvent` carries only ids; each event is resolved against storage to
/// recover the flag key, environment name, and current enabled state. A
/// flag or environment deleted between the change and this lookup is
/// dropped from the stream rather than surfaced as a malformed frame.
pub async fn subscribe(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(project): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let project_id = project
        .parse::<uuid::Uuid>()
        .map(ProjectId::from_uuid)
        .unwrap_or_else(|_| ProjectId::new());

    let receiver = state.change_bus().subscribe();
    let stream = BroadcastStream::new(receiver)
        .then(move |event| {
            let state = state.clone();
            async move { resolve_frame(&state, project_id, event).await }
        })
        .filter_map(|frame| frame);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn resolve_frame(
    state: &AppState,
    project_id: ProjectId,
    event: Result<flaps_storage::ChangeEvent, BroadcastStreamRecvError>,
) -> Option<Result<Event, Infallible>> {
    let event = event.ok()?;

    let flag = state.repos().get_flag_by_id(event.flag_id).await.ok()??;
    if flag.project_id != project_id {
        return None;
    }
    let environment = state
        .repos()
        .get_environment_by_id(event.environment_id)
        .await
        .ok()??;
    let overlay = state
        .repos()
        .get_overlay(flag.id, environment.id)
        .await
        .ok()?;
    let enabled = overlay.map(|o| o.enabled).unwrap_or(false);

    let frame = ChangeFrame {
        action: "updated",
        flag_key: flag.key.as_str().to_string(),
        environment: environment.key,
        enabled,
        timestamp: event.occurred_at,
    };

    let payload = serde_json::to_string(&frame).ok()?;
    Some(Ok(Event::default().data(payload)))
}
