use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use drive_gateway::{
    config::Configuration,
    services::{MemoryStore, SessionStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    // Load configuration
    let configuration = Configuration::new()?;
    tracing::info!("Configuration loaded successfully");

    // Pick the session store backing. The contract is identical either way;
    // this is a deployment choice, not a code fork.
    let store: Arc<dyn SessionStore> = match &configuration.server.redis_url {
        #[cfg(feature = "redis")]
        Some(url) => Arc::new(drive_gateway::services::RedisStore::new(
            url,
            configuration.server.session_ttl_seconds,
        )?),
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            anyhow::bail!("redis_url is set but the binary was built without the redis feature")
        }
        None => Arc::new(MemoryStore::new(configuration.server.session_ttl_seconds)),
    };

    let addr = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );

    let app_state = AppState::new(configuration, store);
    let app = drive_gateway::router(app_state);

    // Start server
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
