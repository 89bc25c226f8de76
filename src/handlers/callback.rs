use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::error::ServerError;
use crate::models::{CallbackParams, CompositeState, OAuthResult};
use crate::AppState;

/// Terminal page shown in the provider-opened browser window. The polling
/// client receives the actual result; nothing sensitive belongs here.
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Authentication Successful</title>
</head>
<body>
    <p>Authentication complete. You can close this window and return to the plugin.</p>
</body>
</html>"#;

/// Redeem the provider redirect: validate the composite state against the
/// stored session, exchange the code, persist the result for the poller and
/// destroy the session.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, ServerError> {
    // Consent denied or any other provider-side error: surface it without
    // touching session state.
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth callback returned an error");
        return Err(ServerError::BadRequest(error));
    }

    let (code, raw_state) = match (params.code, params.state) {
        (Some(code), Some(state)) => (code, state),
        _ => {
            return Err(ServerError::BadRequest(
                "Missing code or state".to_string(),
            ))
        }
    };

    let composite = CompositeState::parse(&raw_state)?;

    let span = tracing::info_span!("oauth_callback", session_id = %composite.session_id);
    let _enter = span.enter();

    let session = state
        .store
        .get_session(&composite.session_id)
        .await?
        .filter(|session| session.state == composite.state)
        .ok_or(ServerError::InvalidState)?;

    if !state.oauth.is_configured() {
        return Err(ServerError::NotConfigured(
            "Server not configured".to_string(),
        ));
    }

    // A failed exchange leaves the session in place; the authorization code
    // is single-use upstream, so a replay fails there anyway.
    let tokens = state
        .oauth
        .exchange_code(&code, &session.code_verifier)
        .await?;

    state
        .store
        .save_result(
            &composite.session_id,
            OAuthResult {
                tokens,
                redirect_to: session.redirect_to,
            },
        )
        .await?;
    state.store.delete_session(&composite.session_id).await?;

    tracing::info!("OAuth callback successful");

    Ok(Html(SUCCESS_HTML))
}
