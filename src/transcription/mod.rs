//! # Transcription Module
//!
//! Speech-to-text is delegated to a remote provider. The rest of the service
//! only sees the [`Transcriber`] trait, so handlers can be exercised with a
//! fake in tests and the ElevenLabs client is the only production implementation.
//!
//! ## Request Parameters (fixed per deployment):
//! - **model_id**: provider model, `scribe_v1` unless configured otherwise
//! - **language_code**: language hint, `en` unless configured otherwise
//! - **num_speakers**: always 1 (single caller leg)
//! - **tag_audio_events**: always off
//! - **timestamps_granularity**: always `none`

pub mod elevenlabs;  // ElevenLabs REST client

pub use elevenlabs::ElevenLabsClient;

use crate::audio::WavBuffer;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Anything that can turn a WAV buffer into text.
///
/// Implementations must be shareable across actix workers.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: WavBuffer) -> Result<TranscriptionResult, TranscriptionError>;
}

/// Transcript returned by the provider.
///
/// Only `text` is used for the HTTP response. The language fields are logged
/// when the provider reports them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionResult {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub language_code: Option<String>,

    #[serde(default)]
    pub language_probability: Option<f32>,
}

impl TranscriptionResult {
    /// Transcript text, or an empty string when the provider sent none.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Timestamp detail requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampsGranularity {
    None,
    Word,
    Character,
}

impl TimestampsGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampsGranularity::None => "none",
            TimestampsGranularity::Word => "word",
            TimestampsGranularity::Character => "character",
        }
    }
}

/// Per-call settings sent alongside the audio.
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    pub model_id: String,
    pub language_code: String,
    pub num_speakers: u32,
    pub tag_audio_events: bool,
    pub timestamps_granularity: TimestampsGranularity,
}

impl TranscriptionOptions {
    /// Options used for telephony audio: one speaker, no event tags, no timestamps.
    pub fn telephony(model_id: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            language_code: language_code.into(),
            num_speakers: 1,
            tag_audio_events: false,
            timestamps_granularity: TimestampsGranularity::None,
        }
    }
}

/// Ways a provider call can fail.
///
/// `Display` is what callers see in the `error` field of a 500 response.
#[derive(Debug)]
pub enum TranscriptionError {
    /// The request never got a response (DNS, TLS, connection reset, ...)
    Request(String),

    /// The provider answered with a non-success status
    Api { status: u16, body: String },

    /// The provider answered 2xx with a body we could not parse
    Decode(String),
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionError::Request(msg) => write!(f, "{}", msg),
            TranscriptionError::Api { status, body } => {
                write!(f, "Status code: {}\nBody: {}", status, body)
            }
            TranscriptionError::Decode(msg) => {
                write!(f, "Failed to parse transcription response: {}", msg)
            }
        }
    }
}

impl std::error::Error for TranscriptionError {}
