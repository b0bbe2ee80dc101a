//! # WAV Encoding
//!
//! Wraps decoded PCM samples in a RIFF/WAVE container (`fmt ` + `data` chunks)
//! with integer 16-bit samples, one channel and the caller's sample rate.

use super::pcm;
use std::fmt;
use std::io::Cursor;

/// Media type used when the buffer is uploaded to the provider.
pub const WAV_MIME: &str = "audio/wav";

/// Output is always mono.
pub const CHANNELS: u16 = 1;

/// Output is always 16-bit integer PCM.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Format tag for integer PCM in the `fmt ` chunk.
pub const WAV_FORMAT_PCM: u16 = 1;

/// RIFF header + `fmt ` chunk + `data` chunk header.
const HEADER_LEN: usize = 44;

/// A complete WAV file held in memory.
///
/// Produced once per request and handed straight to the transcriber.
#[derive(Debug, Clone)]
pub struct WavBuffer {
    bytes: Vec<u8>,
    sample_rate: u32,
    sample_count: usize,
}

impl WavBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total container size in bytes, header included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Audio length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate as f64
    }
}

/// Reasons the encoder can refuse or fail to build a WAV file.
#[derive(Debug)]
pub enum EncodeError {
    /// The byte rate derived from this sample rate does not fit the WAV header
    UnsupportedSampleRate(u32),

    /// The audio is larger than a RIFF chunk can describe
    TooLarge(usize),

    /// Writing the container failed
    Io(std::io::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnsupportedSampleRate(rate) => {
                write!(f, "Sample rate {} Hz cannot be encoded as 16-bit mono WAV", rate)
            }
            EncodeError::TooLarge(bytes) => {
                write!(f, "Audio data of {} bytes exceeds the WAV size limit", bytes)
            }
            EncodeError::Io(err) => write!(f, "Failed to write WAV data: {}", err),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encode raw 16-bit little-endian PCM into a mono 16-bit WAV file.
///
/// ## Steps:
/// 1. Decode every complete sample pair and normalize it into [-1.0, 1.0)
/// 2. Convert the normalized samples back to integer PCM
/// 3. Write the RIFF header, `fmt ` chunk and `data` chunk
///
/// An odd trailing byte in `data` is ignored (see [`pcm::decode_normalized`]).
///
/// ## Errors:
/// - [`EncodeError::UnsupportedSampleRate`] for 0 Hz or a rate whose byte rate overflows `u32`
/// - [`EncodeError::TooLarge`] when the data chunk would exceed 4 GiB
/// - [`EncodeError::Io`] if the writer fails
pub fn encode_pcm16(data: &[u8], sample_rate: u32) -> Result<WavBuffer, EncodeError> {
    let block_align = u32::from(CHANNELS * BITS_PER_SAMPLE / 8);
    if sample_rate == 0 || sample_rate.checked_mul(block_align).is_none() {
        return Err(EncodeError::UnsupportedSampleRate(sample_rate));
    }

    let data_len = pcm::sample_count(data.len()) * pcm::BYTES_PER_SAMPLE;
    if data_len > (u32::MAX as usize) - HEADER_LEN {
        return Err(EncodeError::TooLarge(data_len));
    }

    let normalized = pcm::decode_normalized(data);
    let samples = pcm::denormalize(&normalized);
    let sample_count = samples.len();

    let header = ::wav::Header::new(WAV_FORMAT_PCM, CHANNELS, sample_rate, BITS_PER_SAMPLE);
    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + data_len));
    ::wav::write(header, &::wav::BitDepth::Sixteen(samples), &mut cursor).map_err(EncodeError::Io)?;

    Ok(WavBuffer {
        bytes: cursor.into_inner(),
        sample_rate,
        sample_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    fn sine_pcm(samples: usize) -> (Vec<i16>, Vec<u8>) {
        let values: Vec<i16> = (0..samples)
            .map(|i| ((i as f32 * 0.05).sin() * 12000.0) as i16)
            .collect();
        let bytes = values.iter().flat_map(|s| s.to_le_bytes()).collect();
        (values, bytes)
    }

    /// Walk the RIFF chunks and return the declared size of the `data` chunk.
    fn data_chunk_len(wav: &[u8]) -> Option<u32> {
        let mut offset = 12;
        while offset + 8 <= wav.len() {
            let id = &wav[offset..offset + 4];
            let size = LittleEndian::read_u32(&wav[offset + 4..offset + 8]);
            if id == b"data" {
                return Some(size);
            }
            offset += 8 + size as usize + (size as usize & 1);
        }
        None
    }

    #[test]
    fn test_riff_header_and_data_length() {
        let (_, pcm) = sine_pcm(16000);
        let wav = encode_pcm16(&pcm, 8000).unwrap();
        let bytes = wav.as_bytes();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(data_chunk_len(bytes), Some(2 * 16000));
        assert_eq!(wav.sample_count(), 16000);
        assert_eq!(wav.sample_rate(), 8000);
        assert!((wav.duration_seconds() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_trip_through_wav_reader() {
        let (original, pcm) = sine_pcm(4000);
        let mut extremes = pcm.clone();
        extremes.extend_from_slice(&i16::MIN.to_le_bytes());
        extremes.extend_from_slice(&i16::MAX.to_le_bytes());

        let wav_buffer = encode_pcm16(&extremes, 16000).unwrap();
        let (header, data) = ::wav::read(&mut Cursor::new(wav_buffer.into_bytes())).unwrap();

        assert_eq!(header.audio_format, WAV_FORMAT_PCM);
        assert_eq!(header.channel_count, 1);
        assert_eq!(header.sampling_rate, 16000);
        assert_eq!(header.bits_per_sample, 16);

        let decoded = match data {
            ::wav::BitDepth::Sixteen(samples) => samples,
            _ => panic!("expected 16-bit samples"),
        };

        let mut expected = original;
        expected.push(i16::MIN);
        expected.push(i16::MAX);
        assert_eq!(decoded.len(), expected.len());
        for (want, got) in expected.iter().zip(decoded.iter()) {
            assert!((*want as i32 - *got as i32).abs() <= 1, "{} vs {}", want, got);
        }
    }

    #[test]
    fn test_odd_length_input_encodes_complete_samples() {
        let (_, mut pcm) = sine_pcm(1000);
        pcm.push(0x7F);
        assert_eq!(pcm.len(), 2001);

        let wav = encode_pcm16(&pcm, 8000).unwrap();
        assert_eq!(wav.sample_count(), 1000);
        assert_eq!(data_chunk_len(wav.as_bytes()), Some(2000));
    }

    #[test]
    fn test_rejects_unencodable_sample_rates() {
        let (_, pcm) = sine_pcm(10);
        assert!(matches!(
            encode_pcm16(&pcm, 0),
            Err(EncodeError::UnsupportedSampleRate(0))
        ));
        assert!(matches!(
            encode_pcm16(&pcm, u32::MAX),
            Err(EncodeError::UnsupportedSampleRate(_))
        ));
    }
}
