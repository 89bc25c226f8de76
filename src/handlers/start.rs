use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::ServerError;
use crate::models::{AuthSession, CompositeState, StartParams, StartResponse};
use crate::pkce;
use crate::AppState;

/// Create an authorization session and hand the caller the provider URL to
/// open. No network call happens here; the session just waits for the
/// callback.
pub async fn oauth_start(
    State(state): State<AppState>,
    Query(params): Query<StartParams>,
) -> Result<Json<StartResponse>, ServerError> {
    if !state.oauth.is_configured() {
        return Err(ServerError::NotConfigured(
            "Server not configured".to_string(),
        ));
    }

    let session_id = pkce::random_token();
    let anti_forgery = pkce::random_token();
    let code_verifier = pkce::generate_verifier(pkce::DEFAULT_VERIFIER_BYTES);
    let code_challenge = pkce::generate_challenge(&code_verifier);

    let composite = CompositeState::new(session_id.clone(), anti_forgery.clone())?;
    let url = state
        .oauth
        .build_authorization_url(&composite, &code_challenge)?;

    let session = AuthSession::new(anti_forgery, code_verifier, params.redirect_to);
    state.store.save_session(&session_id, session).await?;

    tracing::info!(session_id = %session_id, "Initiated auth session");

    Ok(Json(StartResponse { url, session_id }))
}
