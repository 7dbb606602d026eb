mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use safemove_api::router::build_router;
use safemove_api::state::AppStateInner;
use safemove_db::Database;
use safemove_lifecycle::Coordinator;
use safemove_lifecycle::clock::SystemClock;
use safemove_lifecycle::sweep;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safemove=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = Arc::new(Database::open(&config.db_path, config.db_readers)?);
    info!("Database ready at {}", config.db_path.display());

    let coordinator = Coordinator::new(
        db,
        config.notifier()?,
        Arc::new(SystemClock),
        config.contacts.clone(),
    );
    info!(
        emergency = config.contacts.emergency.len(),
        wardens = config.contacts.wardens.len(),
        "Notification contacts loaded"
    );

    tokio::spawn(sweep::run_overdue_sweep(coordinator.clone(), config.sweep_interval_secs));

    let app = build_router(AppStateInner::new(coordinator), config.request_timeout());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("SafeMove server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable ({}); waiting for Ctrl+C", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
