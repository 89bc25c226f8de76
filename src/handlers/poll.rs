use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::ServerError;
use crate::models::{PollParams, PollResponse};
use crate::AppState;

/// Repeated-poll endpoint for the caller that never sees the redirect.
/// The call that observes a result consumes it; every later call reports
/// absence. All other calls are side-effect-free.
pub async fn oauth_poll(
    State(state): State<AppState>,
    Query(params): Query<PollParams>,
) -> Result<Json<PollResponse>, ServerError> {
    let session_id = params
        .session_id
        .ok_or_else(|| ServerError::BadRequest("Missing sessionId".to_string()))?;

    let span = tracing::info_span!("oauth_poll", session_id = %session_id);
    let _enter = span.enter();

    if state.store.has_result(&session_id).await? {
        // The existence check and the take race against concurrent pollers;
        // the take's atomicity decides the single winner.
        if let Some(result) = state.store.take_result(&session_id).await? {
            tracing::info!("Poll delivered result");
            return Ok(Json(PollResponse {
                exists: true,
                done: true,
                result: Some(result),
            }));
        }
    }

    if state.store.get_session(&session_id).await?.is_some() {
        return Ok(Json(PollResponse {
            exists: true,
            done: false,
            result: None,
        }));
    }

    Ok(Json(PollResponse {
        exists: false,
        done: false,
        result: None,
    }))
}
