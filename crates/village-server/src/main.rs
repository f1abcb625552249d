mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use argon2::Params;
use tracing::{info, warn};

use village_api::auth::{AppState, AppStateInner};
use village_api::router::router;
use village_api::seed::seed;
use village_api::sessions::run_sweep_loop;
use village_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "village=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let seed_only = std::env::args().skip(1).any(|arg| arg == "--seed");

    let db = Arc::new(Database::open_with_timeout(
        &config.db_path,
        config.db_busy_timeout,
    )?);
    let hashing = Params::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
        Params::DEFAULT_P_COST,
        None,
    )
    .map_err(|e| anyhow::anyhow!("invalid Argon2 parameters: {}", e))?;
    let state: AppState = Arc::new(AppStateInner::new(db, hashing, config.cookie_secure)?);

    if seed_only {
        let seed_state = state.clone();
        let report = tokio::task::spawn_blocking(move || seed(&seed_state)).await??;
        info!(
            "Seed complete: {} users, {} events, {} posts created",
            report.users, report.events, report.posts
        );
        return Ok(());
    }

    tokio::spawn(run_sweep_loop(state.sessions.clone(), config.sweep_interval));

    if !config.static_dir.is_dir() {
        warn!("Static directory {} does not exist", config.static_dir.display());
    }
    let app = router(state, &config.static_dir);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Village Square listening on {}", addr);

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
                warn!("Could not install SIGTERM handler: {}", e);
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
