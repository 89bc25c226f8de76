use axum::{
    extract::State,
    Json,
};
use serde_json::json;

use crate::error::ServerError;
use crate::models::RefreshRequest;
use crate::AppState;

/// Forward a refresh-token grant on behalf of a caller that already holds a
/// refresh token. Stateless; no session is involved.
pub async fn oauth_refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let refresh_token = req
        .refresh_token
        .ok_or_else(|| ServerError::BadRequest("Missing refresh_token".to_string()))?;

    if !state.oauth.is_configured() {
        return Err(ServerError::NotConfigured(
            "Server not configured".to_string(),
        ));
    }

    let tokens = state.oauth.refresh(&refresh_token).await?;

    tracing::info!("Token refresh successful");

    Ok(Json(json!({ "ok": true, "tokens": tokens })))
}
