//! # ElevenLabs Speech-to-Text Client
//!
//! Sends one WAV file per call to `POST {base_url}/v1/speech-to-text` as
//! `multipart/form-data` and returns the parsed transcript.
//!
//! ## Behaviour:
//! - Authenticates with the `xi-api-key` header
//! - No request timeout and no retries; the call lasts as long as the provider takes
//! - Non-2xx answers become [`TranscriptionError::Api`] with the raw response body

use super::{TranscriptionError, TranscriptionOptions, TranscriptionResult, Transcriber};
use crate::audio::{WavBuffer, WAV_MIME};
use crate::config::ElevenLabsConfig;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

/// Path of the batch transcription endpoint.
const SPEECH_TO_TEXT_PATH: &str = "/v1/speech-to-text";

/// File name attached to the uploaded audio part.
const UPLOAD_FILE_NAME: &str = "audio.wav";

/// HTTP client for the ElevenLabs batch speech-to-text API.
#[derive(Clone)]
pub struct ElevenLabsClient {
    http: Client,
    endpoint: String,
    api_key: String,
    options: TranscriptionOptions,
}

impl ElevenLabsClient {
    /// Build a client from the provider section of the app config.
    ///
    /// Fails only if the underlying HTTP client cannot be created (e.g. the
    /// TLS backend cannot initialise).
    pub fn new(config: &ElevenLabsConfig) -> Result<Self> {
        let http = Client::builder().build()?;

        Ok(Self {
            http,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), SPEECH_TO_TEXT_PATH),
            api_key: config.api_key.clone(),
            options: TranscriptionOptions::telephony(&config.model_id, &config.language_code),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> &TranscriptionOptions {
        &self.options
    }

    fn build_form(&self, audio: WavBuffer) -> Result<Form, TranscriptionError> {
        let file = Part::bytes(audio.into_bytes())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(WAV_MIME)
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        Ok(Form::new()
            .part("file", file)
            .text("model_id", self.options.model_id.clone())
            .text("language_code", self.options.language_code.clone())
            .text("num_speakers", self.options.num_speakers.to_string())
            .text("tag_audio_events", self.options.tag_audio_events.to_string())
            .text("timestamps_granularity", self.options.timestamps_granularity.as_str()))
    }
}

#[async_trait]
impl Transcriber for ElevenLabsClient {
    async fn transcribe(&self, audio: WavBuffer) -> Result<TranscriptionResult, TranscriptionError> {
        debug!(
            endpoint = %self.endpoint,
            model_id = %self.options.model_id,
            language_code = %self.options.language_code,
            wav_bytes = audio.len(),
            "Sending audio to ElevenLabs"
        );

        let form = self.build_form(audio)?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TranscriptionError::Decode(e.to_string()))
    }
}
