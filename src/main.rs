use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use agora::auth::session;
use agora::config::{Cli, Config};
use agora::db;
use agora::routes;
use agora::state::{AppState, DbPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Expired sessions are purged by a background task, never from
    // request handling.
    spawn_session_purger(
        pool.clone(),
        config.auth.session_hours,
        config.auth.purge_interval_minutes,
    );

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    // Build router
    let app = routes::api_router()
        .nest_service("/uploads", ServeDir::new(config.uploads_path()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_purger(pool: DbPool, session_hours: u64, interval_minutes: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes.max(1) * 60));
        loop {
            ticker.tick().await;
            match session::purge_expired(&pool, session_hours) {
                Ok(0) => {}
                Ok(purged) => tracing::info!("purged {} expired sessions", purged),
                Err(e) => tracing::warn!("session purge failed: {}", e),
            }
        }
    });
}
