//! # Application State
//!
//! Everything a request handler needs, built once in `main` and handed to actix
//! through `web::Data`.
//!
//! ## Why nothing here is mutable:
//! Requests never share data with each other. The configuration is read-only
//! after startup, and the transcriber is only ever called through `&self`, so
//! plain `Arc`s are enough and no locks are needed.
//!
//! ## Rust Concepts:
//! - **Arc<dyn Transcriber>**: a trait object, so tests can inject a fake
//!   provider without touching the handlers
//! - **Clone**: cloning the state only bumps reference counts

use crate::config::AppConfig;
use crate::transcription::Transcriber;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup
    pub config: Arc<AppConfig>,

    /// Speech-to-text backend used by `/transcribe`
    pub transcriber: Arc<dyn Transcriber>,

    /// When the server started (used for uptime reporting)
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            config: Arc::new(config),
            transcriber,
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
