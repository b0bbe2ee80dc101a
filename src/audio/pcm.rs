//! # PCM Sample Decoding
//!
//! Converts between the wire representation (little-endian `i16` pairs) and the
//! canonical floating-point range [-1.0, 1.0) used as the intermediate form
//! before WAV encoding.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Size of one 16-bit sample on the wire.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Full scale of a signed 16-bit sample.
pub const PCM16_SCALE: f32 = 32768.0;

/// Number of complete samples in a buffer of `byte_len` bytes.
///
/// A trailing unpaired byte does not count as a sample.
pub fn sample_count(byte_len: usize) -> usize {
    byte_len / BYTES_PER_SAMPLE
}

/// Decode 16-bit little-endian PCM and scale each sample into [-1.0, 1.0).
///
/// ## Odd-length input:
/// The read loop stops at the first pair it cannot complete, so a final odd
/// byte is dropped without an error.
///
/// ## Example:
/// `[0x00, 0x40]` is `16384`, which becomes `0.5`.
pub fn decode_normalized(data: &[u8]) -> Vec<f32> {
    let mut cursor = Cursor::new(data);
    let mut samples = Vec::with_capacity(sample_count(data.len()));

    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample as f32 / PCM16_SCALE);
    }

    samples
}

/// Convert normalized float samples back to 16-bit PCM.
///
/// Values outside the representable range are clamped, so `1.0` maps to
/// `i16::MAX` rather than wrapping.
pub fn denormalize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let scaled = (sample * PCM16_SCALE).round();
            scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        })
        .collect()
}
