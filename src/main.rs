use std::time::Duration;

use cascade_seo::app::app;
use cascade_seo::auth::{SessionStore, SESSION_CACHE};
use cascade_seo::config::{self, SessionStrategy};
use cascade_seo::database::DatabaseManager;
use tracing_subscriber::EnvFilter;

/// How often expired cache entries and session rows are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cascade_seo=info,tower_http=info")))
        .init();

    let config = config::config();
    tracing::info!(
        "Starting Cascade SEO in {:?} mode ({:?} sessions)",
        config.environment,
        config.security.session_strategy
    );

    if cascade_seo::is_production!()
        && config.security.session_strategy == SessionStrategy::Jwt
        && config.security.jwt_secret.is_empty()
    {
        anyhow::bail!("AUTH_SECRET must be set to issue JWT sessions in production");
    }

    if config.database.run_migrations {
        // The server still starts so /health can report the database as degraded
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::warn!("Skipping migrations: {}", e);
        }
    }

    tokio::spawn(sweep_sessions());

    // Allow tests or deployments to override port via env
    let port = std::env::var("CASCADE_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Cascade SEO listening on http://{}", bind_addr);

    axum::serve(listener, app())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close_all().await;
    Ok(())
}

async fn sweep_sessions() {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;

        let purged = SESSION_CACHE.purge_expired().await;
        if purged > 0 {
            tracing::debug!("Purged {} cached sessions", purged);
        }

        let Ok(pool) = DatabaseManager::pool().await else {
            continue;
        };
        match SessionStore::new(pool).delete_expired().await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Deleted {} expired sessions", n),
            Err(e) => tracing::warn!("Session sweep failed: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
