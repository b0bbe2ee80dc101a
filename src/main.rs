//! # ElevenLabs STT - Main Application Entry Point
//!
//! HTTP adapter between the telephony platform and the ElevenLabs speech-to-text
//! API. Asterisk posts raw signed-linear audio to `POST /transcribe`; the service
//! wraps it in a WAV container, forwards it to ElevenLabs and answers with the
//! transcript.
//!
//! ## Application Architecture:
//! - **config**: Startup configuration (defaults, config.toml, environment variables)
//! - **state**: Immutable state shared with every handler (config + transcriber)
//! - **audio**: PCM decoding and WAV encoding
//! - **transcription**: `Transcriber` trait and the ElevenLabs client
//! - **handlers**: HTTP routes (`/transcribe`, `/health`)
//! - **middleware**: Request logging
//! - **error**: Error types and their JSON responses

mod audio;       // PCM → WAV conversion (audio/ directory)
mod config;      // Configuration management (config.rs)
mod error;       // Error handling types (error.rs)
mod handlers;    // HTTP request handlers (handlers/ directory)
mod health;      // Health check endpoint (health.rs)
mod middleware;  // Custom middleware (middleware/ directory)
mod state;       // Application state (state.rs)
mod transcription; // Speech-to-text providers (transcription/ directory)

use crate::config::AppConfig;
use crate::state::AppState;
use crate::transcription::ElevenLabsClient;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from `.env`, config.toml and environment variables
/// 2. **Sets up logging**
/// 3. **Builds the ElevenLabs client** and the shared state
/// 4. **Starts the HTTP server** and waits for it to stop or for a shutdown signal
///
/// Any failure before the server is listening (missing API key, bad port,
/// address already in use) ends the process with an error.
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!(
        model_id = %config.elevenlabs.model_id,
        language_code = %config.elevenlabs.language_code,
        max_payload_bytes = config.server.max_payload_bytes,
        "Configuration loaded: {}",
        config.bind_addr()
    );

    let client = ElevenLabsClient::new(&config.elevenlabs).context("Failed to create ElevenLabs client")?;
    let bind_addr = config.bind_addr();
    let max_payload_bytes = config.server.max_payload_bytes;
    let app_state = AppState::new(config, Arc::new(client));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .configure(|cfg| handlers::configure(cfg, max_payload_bytes))
    })
    .disable_signals()
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run();

    info!("ElevenLabs STT listening on {}", bind_addr);

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        signal = shutdown_signal() => {
            info!("{} received, stopping server...", signal);
            // Let in-flight transcriptions finish
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// ## Environment Variables:
/// - `RUST_LOG`: log filter, e.g. `debug` or `elevenlabs_stt=trace`
/// - If not set, defaults to `elevenlabs_stt=debug,actix_web=info`
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elevenlabs_stt=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Resolve when the process is asked to stop (Ctrl+C, or SIGTERM on Unix).
///
/// Returns the name of the signal for the shutdown log line.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
