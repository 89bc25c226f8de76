mod callback;
mod download;
mod info;
mod poll;
mod proxy;
mod refresh;
mod start;

pub use callback::oauth_callback;
pub use download::download_file;
pub use info::file_info;
pub use poll::oauth_poll;
pub use proxy::proxy_fetch;
pub use refresh::oauth_refresh;
pub use start::oauth_start;

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::now())
}

/// Uptime-ping target that doubles as an explicit sweep trigger for
/// deployments where the background sweeper task cannot be relied on.
pub async fn cron_sweep(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.store.sweep().await {
        Ok(purged) if purged > 0 => tracing::info!(purged, "Sweep purged expired entries"),
        Ok(_) => {}
        Err(e) => tracing::warn!("Sweep failed: {}", e),
    }
    Json(HealthResponse::now())
}
