//! RideCompare Backend Service
//!
//! Main entry point for the live ride-price comparison backend.
//! This service provides:
//! - WebSocket endpoint streaming refreshed price snapshots per client
//! - Concurrent geocoding and multi-provider fare estimation per cycle

use ridecompare_backend::error::{map_to_app_error, AppError, AppResult};
use ridecompare_backend::websocket::WebSocketServer;
use ridecompare_backend::{AppConfig, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ridecompare_backend={},tokio_tungstenite=warn", config.log_level).into()
    });

    if config.json_logs() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           RideCompare Backend Starting                    ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!(
        "Session timing: receive {:?}, idle {:?}, cadence {:?}",
        config.session.receive_timeout(),
        config.session.idle_poll(),
        config.session.cadence()
    );
    info!(
        "Providers: {}",
        config
            .providers
            .iter()
            .map(|p| format!("{}:{}", p.id, p.category))
            .collect::<Vec<_>>()
            .join(", ")
    );
    if config.geocoder.api_key.is_none() {
        warn!("OPENCAGE_API_KEY not set - routed trips will report geocoding failures");
    }

    // =========================================================================
    // SHARED RESOURCES
    // =========================================================================
    let app_state = Arc::new(AppState::from_config(config.clone())?);
    info!("✓ Geocoder and fare predictor initialized");

    let ws_server = Arc::new(WebSocketServer::new(app_state.clone()));

    // =========================================================================
    // START SERVER
    // =========================================================================
    let ws_addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid WebSocket address: {}", e)))?;

    let listener = map_to_app_error(
        TcpListener::bind(ws_addr).await,
        "Failed to bind WebSocket server",
    )?;

    let ws_handle = tokio::spawn(ws_server.serve(listener));

    info!("✓ WebSocket server listening on ws://{}{}", ws_addr, config.ws_path);
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        result = ws_handle => {
            error!("WebSocket server exited unexpectedly: {:?}", result);
        }
    }

    info!("RideCompare backend shutdown complete");
    Ok(())
}
