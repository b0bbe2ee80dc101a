//! # `POST /transcribe`
//!
//! Receives raw signed-linear PCM from the telephony platform and answers with
//! the transcript.
//!
//! ## Request:
//! - Body: raw PCM bytes, `Content-Type: application/octet-stream`
//! - `X-Sample-Rate`: required, positive integer (Hz)
//! - `X-Audio-Format`: optional label, logged only
//!
//! ## Pipeline:
//! validate → encode (blocking pool) → transcribe → respond. The first failing
//! step decides the response; nothing is retried.

use crate::audio::{encode_pcm16, pcm};
use crate::error::{AppError, AppResult, ProcessingError, EMPTY_AUDIO_MESSAGE, INVALID_SAMPLE_RATE_MESSAGE};
use crate::state::AppState;
use crate::transcription::Transcriber;
use actix_web::http::header::HeaderValue;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{error, info, warn};

pub const SAMPLE_RATE_HEADER: &str = "x-sample-rate";
pub const AUDIO_FORMAT_HEADER: &str = "x-audio-format";

/// Asterisk's native format, assumed when `X-Audio-Format` is absent.
pub const DEFAULT_AUDIO_FORMAT: &str = "audio/x-signed-linear";

/// The only body type read as audio.
pub const AUDIO_CONTENT_TYPE: &str = "application/octet-stream";

/// Outcome of reading the `X-Sample-Rate` header.
///
/// Parsing is total: every header value lands in exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleRateHeader {
    /// Header not sent
    Missing,

    /// Header sent but not a positive integer (raw value kept for logging)
    Invalid(String),

    /// Usable sample rate in Hz
    Valid(u32),
}

impl SampleRateHeader {
    pub fn parse(value: Option<&HeaderValue>) -> Self {
        let Some(value) = value else {
            return SampleRateHeader::Missing;
        };

        let Ok(text) = value.to_str() else {
            return SampleRateHeader::Invalid(String::from_utf8_lossy(value.as_bytes()).into_owned());
        };

        match text.trim().parse::<u32>() {
            Ok(rate) if rate > 0 => SampleRateHeader::Valid(rate),
            _ => SampleRateHeader::Invalid(text.to_string()),
        }
    }
}

/// A validated transcription request.
///
/// Lives only for the duration of one HTTP request.
#[derive(Debug, Clone)]
pub struct AudioRequest {
    pub pcm: web::Bytes,
    pub sample_rate_hz: u32,
    pub audio_format: String,
}

impl AudioRequest {
    /// Validate the body and headers, in this order:
    /// 1. the body must be non-empty
    /// 2. `X-Sample-Rate` must be a positive integer
    ///
    /// A body sent with any content type other than `application/octet-stream`
    /// is not treated as audio, so it fails check 1.
    pub fn from_http(req: &HttpRequest, body: web::Bytes) -> AppResult<Self> {
        let pcm = if req.content_type().eq_ignore_ascii_case(AUDIO_CONTENT_TYPE) {
            body
        } else {
            if !body.is_empty() {
                warn!(
                    content_type = %req.content_type(),
                    "Ignoring request body with unsupported content type"
                );
            }
            web::Bytes::new()
        };

        if pcm.is_empty() {
            error!("Received empty audio buffer.");
            return Err(AppError::BadRequest(EMPTY_AUDIO_MESSAGE.to_string()));
        }

        let sample_rate_hz = match SampleRateHeader::parse(req.headers().get(SAMPLE_RATE_HEADER)) {
            SampleRateHeader::Valid(rate) => rate,
            SampleRateHeader::Missing => {
                error!("Invalid or missing X-Sample-Rate header: <absent>");
                return Err(AppError::BadRequest(INVALID_SAMPLE_RATE_MESSAGE.to_string()));
            }
            SampleRateHeader::Invalid(raw) => {
                error!("Invalid or missing X-Sample-Rate header: {}", raw);
                return Err(AppError::BadRequest(INVALID_SAMPLE_RATE_MESSAGE.to_string()));
            }
        };

        let audio_format = req
            .headers()
            .get(AUDIO_FORMAT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_AUDIO_FORMAT)
            .to_string();

        Ok(Self {
            pcm,
            sample_rate_hz,
            audio_format,
        })
    }

    fn size_kb(&self) -> f64 {
        self.pcm.len() as f64 / 1024.0
    }
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcription: String,
}

/// Handler for `POST /transcribe`.
pub async fn transcribe(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    info!("Transcription Service: Received request on /transcribe");

    let audio = AudioRequest::from_http(&req, body)?;

    info!(
        "Received audio buffer: {:.2} KB, Sample Rate: {} Hz, Format: {}",
        audio.size_kb(),
        audio.sample_rate_hz,
        audio.audio_format
    );

    match process_audio(state.transcriber.as_ref(), audio).await {
        Ok(transcription) => Ok(HttpResponse::Ok().json(TranscribeResponse { transcription })),
        Err(err) => {
            error!(error = %err, "Error processing audio");
            Err(AppError::Processing(err))
        }
    }
}

/// Encode the PCM as WAV and send it to the transcriber.
///
/// Returns the transcript text, empty when the provider produced none.
pub async fn process_audio(
    transcriber: &dyn Transcriber,
    audio: AudioRequest,
) -> Result<String, ProcessingError> {
    info!("Converting PCM to WAV format...");
    if audio.pcm.len() % pcm::BYTES_PER_SAMPLE != 0 {
        warn!(
            bytes = audio.pcm.len(),
            "Odd-length PCM buffer, trailing byte will be ignored"
        );
    }

    let AudioRequest {
        pcm: data,
        sample_rate_hz,
        ..
    } = audio;

    let wav = web::block(move || encode_pcm16(&data, sample_rate_hz))
        .await
        .map_err(|e| ProcessingError::Worker(e.to_string()))??;

    info!(
        duration_seconds = wav.duration_seconds(),
        "Converted to WAV: {:.2} KB",
        wav.len() as f64 / 1024.0
    );

    let result = transcriber.transcribe(wav).await?;

    let text = result.text_or_empty();
    info!(
        language_code = ?result.language_code,
        language_probability = ?result.language_probability,
        "Transcription: {}",
        if text.is_empty() { "No text transcribed" } else { text }
    );

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WavBuffer;
    use crate::config::AppConfig;
    use crate::transcription::{TranscriptionError, TranscriptionResult};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    enum StubReply {
        Text(Option<String>),
        Fail(String),
    }

    /// Fake provider that records what it was sent.
    struct StubTranscriber {
        reply: StubReply,
        calls: AtomicUsize,
        last_audio: Mutex<Option<(u32, usize)>>,
    }

    impl StubTranscriber {
        fn new(reply: StubReply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_audio: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_audio(&self) -> Option<(u32, usize)> {
            *self.last_audio.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(&self, audio: WavBuffer) -> Result<TranscriptionResult, TranscriptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_audio.lock().unwrap() = Some((audio.sample_rate(), audio.sample_count()));

            match &self.reply {
                StubReply::Text(text) => Ok(TranscriptionResult {
                    text: text.clone(),
                    ..Default::default()
                }),
                StubReply::Fail(msg) => Err(TranscriptionError::Request(msg.clone())),
            }
        }
    }

    fn pcm_bytes(samples: usize) -> Vec<u8> {
        (0..samples)
            .flat_map(|i| (((i % 200) as i16 - 100) * 150).to_le_bytes())
            .collect()
    }

    fn audio_post(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/transcribe")
            .insert_header((header::CONTENT_TYPE, AUDIO_CONTENT_TYPE))
            .set_payload(body)
    }

    async fn send(
        stub: Arc<StubTranscriber>,
        max_payload_bytes: usize,
        req: test::TestRequest,
    ) -> (StatusCode, web::Bytes) {
        let mut config = AppConfig::default();
        config.elevenlabs.api_key = "sk-test".to_string();
        let state = AppState::new(config, stub);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| crate::handlers::configure(cfg, max_payload_bytes)),
        )
        .await;

        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        (status, test::read_body(resp).await)
    }

    fn json(body: &web::Bytes) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    const LIMIT: usize = 50 * 1024 * 1024;

    #[actix_web::test]
    async fn test_transcribes_valid_audio() {
        let stub = StubTranscriber::new(StubReply::Text(Some("hello world".to_string())));
        let req = audio_post(pcm_bytes(16000)).insert_header(("X-Sample-Rate", "8000"));

        let (status, body) = send(stub.clone(), LIMIT, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), serde_json::json!({ "transcription": "hello world" }));
        assert_eq!(stub.calls(), 1);
        assert_eq!(stub.last_audio(), Some((8000, 16000)));
    }

    #[actix_web::test]
    async fn test_missing_provider_text_becomes_empty_string() {
        let stub = StubTranscriber::new(StubReply::Text(None));
        let req = audio_post(pcm_bytes(100)).insert_header(("X-Sample-Rate", "16000"));

        let (status, body) = send(stub, LIMIT, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["transcription"], "");
    }

    #[actix_web::test]
    async fn test_empty_body_is_rejected_before_processing() {
        let stub = StubTranscriber::new(StubReply::Text(Some("unused".to_string())));
        let req = audio_post(Vec::new()).insert_header(("X-Sample-Rate", "8000"));

        let (status, body) = send(stub.clone(), LIMIT, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body), serde_json::json!({ "message": "Empty audio data received." }));
        assert_eq!(stub.calls(), 0);
    }

    #[actix_web::test]
    async fn test_empty_body_wins_over_missing_sample_rate() {
        let stub = StubTranscriber::new(StubReply::Text(None));
        let (status, body) = send(stub, LIMIT, audio_post(Vec::new())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["message"], EMPTY_AUDIO_MESSAGE);
    }

    #[actix_web::test]
    async fn test_missing_or_invalid_sample_rate_is_rejected() {
        for sample_rate in [None, Some("abc"), Some("0"), Some("-8000"), Some("")] {
            let stub = StubTranscriber::new(StubReply::Text(Some("unused".to_string())));
            let mut req = audio_post(pcm_bytes(10));
            if let Some(value) = sample_rate {
                req = req.insert_header(("X-Sample-Rate", value));
            }

            let (status, body) = send(stub.clone(), LIMIT, req).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "sample rate {:?}", sample_rate);
            assert_eq!(
                json(&body),
                serde_json::json!({ "message": "Missing or invalid X-Sample-Rate header." })
            );
            assert_eq!(stub.calls(), 0);
        }
    }

    #[actix_web::test]
    async fn test_provider_failure_returns_500_with_detail() {
        let stub = StubTranscriber::new(StubReply::Fail("getaddrinfo ENOTFOUND api.elevenlabs.io".to_string()));
        let req = audio_post(pcm_bytes(1600)).insert_header(("X-Sample-Rate", "8000"));

        let (status, body) = send(stub.clone(), LIMIT, req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(&body);
        assert_eq!(body["message"], "Error processing audio");
        assert_eq!(body["error"], "getaddrinfo ENOTFOUND api.elevenlabs.io");
        assert_eq!(stub.calls(), 1);
    }

    #[actix_web::test]
    async fn test_service_keeps_serving_after_a_failure() {
        let stub = StubTranscriber::new(StubReply::Fail("boom".to_string()));
        let mut config = AppConfig::default();
        config.elevenlabs.api_key = "sk-test".to_string();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(config, stub.clone())))
                .configure(|cfg| crate::handlers::configure(cfg, LIMIT)),
        )
        .await;

        for _ in 0..2 {
            let req = audio_post(pcm_bytes(10))
                .insert_header(("X-Sample-Rate", "8000"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(stub.calls(), 2);
    }

    #[actix_web::test]
    async fn test_unencodable_sample_rate_returns_500() {
        let stub = StubTranscriber::new(StubReply::Text(Some("unused".to_string())));
        let req = audio_post(pcm_bytes(10)).insert_header(("X-Sample-Rate", "4000000000"));

        let (status, body) = send(stub.clone(), LIMIT, req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(&body)["message"], "Error processing audio");
        assert_eq!(stub.calls(), 0);
    }

    #[actix_web::test]
    async fn test_odd_length_body_drops_trailing_byte() {
        let stub = StubTranscriber::new(StubReply::Text(Some("ok".to_string())));
        let mut body = pcm_bytes(1000);
        body.push(0x01);
        assert_eq!(body.len(), 2001);

        let (status, _) = send(stub.clone(), LIMIT, audio_post(body).insert_header(("X-Sample-Rate", "8000"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(stub.last_audio(), Some((8000, 1000)));
    }

    #[actix_web::test]
    async fn test_non_octet_stream_body_counts_as_empty() {
        let stub = StubTranscriber::new(StubReply::Text(Some("unused".to_string())));
        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header((header::CONTENT_TYPE, "audio/wav"))
            .insert_header(("X-Sample-Rate", "8000"))
            .set_payload(pcm_bytes(10));

        let (status, body) = send(stub.clone(), LIMIT, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["message"], EMPTY_AUDIO_MESSAGE);
        assert_eq!(stub.calls(), 0);
    }

    #[actix_web::test]
    async fn test_oversized_body_is_rejected() {
        let stub = StubTranscriber::new(StubReply::Text(Some("unused".to_string())));
        let req = audio_post(pcm_bytes(64)).insert_header(("X-Sample-Rate", "8000"));

        let (status, _) = send(stub.clone(), 32, req).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(stub.calls(), 0);
    }

    #[::core::prelude::v1::test]
    fn test_sample_rate_header_parsing() {
        assert_eq!(SampleRateHeader::parse(None), SampleRateHeader::Missing);
        assert_eq!(
            SampleRateHeader::parse(Some(&HeaderValue::from_static("8000"))),
            SampleRateHeader::Valid(8000)
        );
        assert_eq!(
            SampleRateHeader::parse(Some(&HeaderValue::from_static(" 16000 "))),
            SampleRateHeader::Valid(16000)
        );
        assert_eq!(
            SampleRateHeader::parse(Some(&HeaderValue::from_static("abc"))),
            SampleRateHeader::Invalid("abc".to_string())
        );
        assert_eq!(
            SampleRateHeader::parse(Some(&HeaderValue::from_static("8000Hz"))),
            SampleRateHeader::Invalid("8000Hz".to_string())
        );
        assert_eq!(
            SampleRateHeader::parse(Some(&HeaderValue::from_static("0"))),
            SampleRateHeader::Invalid("0".to_string())
        );
    }

    #[::core::prelude::v1::test]
    fn test_audio_format_defaults_to_signed_linear() {
        let req = test::TestRequest::post()
            .insert_header((header::CONTENT_TYPE, AUDIO_CONTENT_TYPE))
            .insert_header(("X-Sample-Rate", "8000"))
            .to_http_request();
        let audio = AudioRequest::from_http(&req, web::Bytes::from(pcm_bytes(4))).unwrap();
        assert_eq!(audio.audio_format, DEFAULT_AUDIO_FORMAT);
        assert_eq!(audio.sample_rate_hz, 8000);

        let req = test::TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/octet-stream; charset=binary"))
            .insert_header(("X-Sample-Rate", "8000"))
            .insert_header(("X-Audio-Format", "audio/l16"))
            .to_http_request();
        let audio = AudioRequest::from_http(&req, web::Bytes::from(pcm_bytes(4))).unwrap();
        assert_eq!(audio.audio_format, "audio/l16");
    }
}
