use serde::{Deserialize, Serialize};

use super::OAuthResult;

// GET /oauth/start
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    pub redirect_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub url: String,
    pub session_id: String,
}

// GET /oauth/callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

// GET /oauth/poll
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollParams {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub exists: bool,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OAuthResult>,
}

// POST /oauth/refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

// GET /proxy
#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

// GET /health, GET /cron/sweep
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: i64,
}

impl HealthResponse {
    pub fn now() -> Self {
        Self {
            ok: true,
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}
