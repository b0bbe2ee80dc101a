//! # Error Handling
//!
//! This module defines the errors a `/transcribe` request can end in and how
//! each one is turned into an HTTP response.
//!
//! ## Error Categories:
//! - **Client input errors** (empty body, bad `X-Sample-Rate`): detected before any
//!   processing, reported as 400 with a fixed human-readable message
//! - **Processing errors** (WAV encoding, provider or network failure): reported as
//!   500 with a generic message plus the underlying failure text
//!
//! Startup failures (config, credential, port binding) never reach this module;
//! they are `anyhow::Error`s returned from `main`.
//!
//! ## JSON Response Format:
//! ```json
//! { "message": "Missing or invalid X-Sample-Rate header." }
//! { "message": "Error processing audio", "error": "Status code: 401\nBody: ..." }
//! ```

use crate::audio::EncodeError;
use crate::transcription::TranscriptionError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Message returned when the request body holds no audio.
pub const EMPTY_AUDIO_MESSAGE: &str = "Empty audio data received.";

/// Message returned when `X-Sample-Rate` is absent or not a positive integer.
pub const INVALID_SAMPLE_RATE_MESSAGE: &str = "Missing or invalid X-Sample-Rate header.";

/// Top-level message for every 500 response.
pub const PROCESSING_FAILED_MESSAGE: &str = "Error processing audio";

/// Errors returned by the HTTP handlers.
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::BadRequest(EMPTY_AUDIO_MESSAGE.to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Client sent a request we cannot process (400)
    BadRequest(String),

    /// Encoding or transcription failed after validation passed (500)
    Processing(ProcessingError),
}

/// A failure in one of the pipeline stages after validation.
///
/// `Display` prints only the underlying failure text, because that text is
/// what ends up in the `error` field of the 500 response.
#[derive(Debug)]
pub enum ProcessingError {
    /// PCM to WAV conversion failed
    Encode(EncodeError),

    /// The blocking encode task was cancelled or panicked
    Worker(String),

    /// The transcription provider call failed
    Transcription(TranscriptionError),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::Encode(err) => write!(f, "{}", err),
            ProcessingError::Worker(msg) => write!(f, "Encoding task failed: {}", msg),
            ProcessingError::Transcription(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProcessingError {}

impl From<EncodeError> for ProcessingError {
    fn from(err: EncodeError) -> Self {
        ProcessingError::Encode(err)
    }
}

impl From<TranscriptionError> for ProcessingError {
    fn from(err: TranscriptionError) -> Self {
        ProcessingError::Transcription(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Processing(err) => write!(f, "{}: {}", PROCESSING_FAILED_MESSAGE, err),
        }
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::Processing(err)
    }
}

/// Body of every error response.
///
/// `error` is only present for processing failures; client errors carry the
/// message alone.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Converts handler errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - BadRequest → 400
/// - Processing → 500
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::BadRequest(msg) => ErrorBody {
                message: msg.clone(),
                error: None,
            },
            AppError::Processing(err) => ErrorBody {
                message: PROCESSING_FAILED_MESSAGE.to_string(),
                error: Some(err.to_string()),
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Shorthand for handler results.
pub type AppResult<T> = Result<T, AppError>;
