pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pkce;
pub mod services;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use config::Configuration;
use services::{DriveClient, OAuthClient, RateLimiter, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub oauth: Arc<OAuthClient>,
    pub drive: Arc<DriveClient>,
    pub download_limiter: Arc<RateLimiter>,
    pub info_limiter: Arc<RateLimiter>,
    pub http: reqwest::Client,
    pub config: Arc<Configuration>,
}

impl AppState {
    pub fn new(config: Configuration, store: Arc<dyn SessionStore>) -> Self {
        let window = Duration::from_secs(config.rate_limit.window_seconds);
        Self {
            store,
            oauth: Arc::new(OAuthClient::new(&config.google)),
            drive: Arc::new(DriveClient::new(&config.google)),
            download_limiter: Arc::new(RateLimiter::new(
                config.rate_limit.download_per_window,
                window,
            )),
            info_limiter: Arc::new(RateLimiter::new(config.rate_limit.info_per_window, window)),
            http: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/cron/sweep", get(handlers::cron_sweep))
        .route("/oauth/start", get(handlers::oauth_start))
        .route("/oauth/callback", get(handlers::oauth_callback))
        .route("/oauth/poll", get(handlers::oauth_poll))
        .route("/oauth/refresh", post(handlers::oauth_refresh))
        .route("/download/{file_id}", get(handlers::download_file))
        .route("/info/{file_id}", get(handlers::file_info))
        .route("/proxy", get(handlers::proxy_fetch))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cors::middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
