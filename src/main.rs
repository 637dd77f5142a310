use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use programmes::api::router;
use programmes::config::AppConfig;
use programmes::db;
use programmes::services::SyncScheduler;
use programmes::state::AppState;
use programmes::vle::VleHttpClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "programmes=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    let vle = Arc::new(VleHttpClient::new(config.vle.clone())?);
    let state = AppState::new(pool, vle);

    let scheduler = SyncScheduler::new(state.sync.clone(), config.sync_times.clone());
    tokio::spawn(async move {
        scheduler.start().await;
    });

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
