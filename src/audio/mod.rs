//! # Audio Conversion Module
//!
//! Turns the raw signed-linear audio sent by the telephony platform into a WAV
//! file the transcription provider accepts.
//!
//! ## Input Format:
//! - **Encoding**: 16-bit signed PCM, little-endian ("slin")
//! - **Channels**: Mono (1 channel)
//! - **Sample Rate**: whatever the caller declares in `X-Sample-Rate`
//!
//! ## Pipeline:
//! raw bytes → [`pcm::decode_normalized`] → [`pcm::denormalize`] → [`encoder::encode_pcm16`]
//!
//! Nothing here is resampled, mixed or format-detected; the `X-Audio-Format`
//! label is informational only.

pub mod pcm;     // Sample decoding and float normalization
pub mod encoder; // WAV container encoding

pub use encoder::{encode_pcm16, EncodeError, WavBuffer, WAV_MIME};
