//! # Configuration Management
//!
//! This module loads the service configuration once at startup. After that the
//! configuration is immutable and shared read-only with every request handler.
//!
//! ## Sources (highest priority first):
//! 1. Well-known environment variables (`ELEVENLABS_API_KEY`, `PORT`, ...)
//! 2. Environment variables with the `APP_` prefix (`APP_SERVER__PORT`, `APP_ELEVENLABS__MODEL_ID`)
//! 3. Configuration file (`config.toml`, optional)
//! 4. Default values (defined in the Default impl)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: the defaults are serialized into the `config` crate and the merged
//!   result is deserialized back into [`AppConfig`]
//! - **Manual Debug impl**: keeps the provider API key out of log output

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Default TCP port the telephony platform expects the service on.
pub const DEFAULT_PORT: u16 = 6022;

/// Default request body limit (50 MB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Well-known environment variables and the config keys they override.
///
/// These names are what deployment scripts already set, so they win over
/// both the config file and the `APP_` prefixed variables.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("ELEVENLABS_API_KEY", "elevenlabs.api_key"),
    ("ELEVENLABS_MODEL_ID", "elevenlabs.model_id"),
    ("ELEVENLABS_LANGUAGE_CODE", "elevenlabs.language_code"),
    ("ELEVENLABS_BASE_URL", "elevenlabs.base_url"),
];

/// Main application configuration.
///
/// ## Why separate config structs:
/// The HTTP listener and the transcription provider are configured
/// independently, so each gets its own group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub elevenlabs: ElevenLabsConfig,
}

/// HTTP listener settings.
///
/// ## Fields:
/// - `host`: address to bind (`0.0.0.0` accepts connections from the PBX host)
/// - `port`: TCP port to listen on
/// - `max_payload_bytes`: largest request body accepted on `/transcribe`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_payload_bytes: usize,
}

/// Settings forwarded to the ElevenLabs speech-to-text API.
#[derive(Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    /// Credential sent as the `xi-api-key` header. Required.
    pub api_key: String,

    /// Model selector, e.g. `scribe_v1`.
    pub model_id: String,

    /// ISO-639 language hint, e.g. `en`.
    pub language_code: String,

    /// API root without a trailing slash.
    pub base_url: String,
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model_id", &self.model_id)
            .field("language_code", &self.language_code)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            },
            elevenlabs: ElevenLabsConfig {
                api_key: String::new(), // no usable default, validate() rejects it
                model_id: "scribe_v1".to_string(),
                language_code: "en".to_string(),
                base_url: "https://api.elevenlabs.io".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from every source, reading the real process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|name| env::var(name).ok())
    }

    /// Load configuration, resolving the well-known variables through `lookup`.
    ///
    /// ## Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with `APP_` environment variables
    /// 4. Apply the well-known variables returned by `lookup`
    ///
    /// Empty values from `lookup` are skipped, so `ELEVENLABS_MODEL_ID=` behaves
    /// the same as leaving the variable unset.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = ::config::Config::builder()
            .add_source(::config::Config::try_from(&AppConfig::default())?)
            .add_source(::config::File::with_name("config").required(false))
            .add_source(
                ::config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        for &(var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                settings = settings.set_override(key, value)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration can actually serve requests.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Payload limit is greater than 0
    /// - The provider API key, model id, language code and base URL are set
    ///
    /// A failure here stops the process before it binds the port.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.server.max_payload_bytes == 0 {
            return Err(anyhow::anyhow!("Max payload size must be greater than 0"));
        }

        if self.elevenlabs.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "ELEVENLABS_API_KEY is not set; the transcription provider requires it"
            ));
        }

        if self.elevenlabs.model_id.trim().is_empty() {
            return Err(anyhow::anyhow!("ElevenLabs model id cannot be empty"));
        }

        if self.elevenlabs.language_code.trim().is_empty() {
            return Err(anyhow::anyhow!("ElevenLabs language code cannot be empty"));
        }

        if self.elevenlabs.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("ElevenLabs base URL cannot be empty"));
        }

        Ok(())
    }

    /// `host:port` string handed to `HttpServer::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
