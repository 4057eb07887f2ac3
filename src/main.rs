//! # Cloudroom Transcription Service
//!
//! WebSocket service for streaming speech-to-text. Clients connect to
//! `/ws/transcribe`, send one JSON handshake, then stream binary PCM audio
//! and receive incremental (`partial`) and final (`segment`) transcription
//! events until they send `{"type":"stop"}` or disconnect.
//!
//! ## Application layout:
//! - **config**: layered configuration (config.toml + environment)
//! - **state**: shared application state and runtime counters
//! - **recognizer**: speech engine adapter seam (Vosk backend behind a feature)
//! - **session**: the per-connection streaming protocol core
//! - **websocket**: actix WebSocket actor wiring the session to the transport
//! - **health**: liveness and metrics endpoints
//! - **middleware**: HTTP request logging and counters
//! - **error**: session and HTTP error types

mod config;
mod error;
mod health;
mod middleware;
mod recognizer;
mod session;
mod state;
mod websocket;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag set by the signal handler task and polled by main.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting cloudroom-transcribe v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}, model dir {}",
        config.server.host, config.server.port, config.models.model_dir
    );

    // The recognition model is loaded once and shared read-only by every
    // session. A missing model directory is fatal before we bind the socket.
    let engine = recognizer::load_engine(&config.models)?;

    let app_state = AppState::new(config.clone(), engine);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::RequestLogging)
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::runtime_metrics))
            .route("/ws/transcribe", web::get().to(websocket::transcribe_websocket))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudroom_transcribe=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Install SIGTERM/SIGINT handlers that set the global shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag until it is set.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
