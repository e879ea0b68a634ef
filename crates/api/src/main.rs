use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunegrab_api::background::artifact_sweep;
use tunegrab_api::config::ServerConfig;
use tunegrab_api::router::build_app_router;
use tunegrab_api::state::AppState;
use tunegrab_core::dependencies;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tunegrab_api=debug,tunegrab_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        downloads_dir = %config.downloads_dir.display(),
        converter = %config.toolchain.converter,
        "Loaded server configuration"
    );

    tokio::fs::create_dir_all(&config.downloads_dir)
        .await
        .expect("Failed to create downloads directory");

    // Conversions are refused while tools are missing; report it up front.
    let report = dependencies::check(&config.toolchain).await;
    if report.ok() {
        tracing::info!("Toolchain available");
    } else {
        tracing::warn!(missing = ?report.missing(), "Toolchain incomplete, conversions will be refused");
    }

    // --- App state ---
    let state = AppState::from_config(config.clone());

    // --- Artifact sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(artifact_sweep::run(
        state.scheduler.clone(),
        Duration::from_secs(config.job_expiry_secs),
        Duration::from_secs(config.sweep_interval_secs),
        sweep_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Artifact sweep stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
