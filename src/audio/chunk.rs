//! Audio chunk decoding.

use crate::defaults;
use crate::error::{AxonwatchError, Result};
use std::time::Duration;

/// One encoded audio payload received from the inference stream.
///
/// The payload is little-endian 16-bit PCM; sample rate and channel count
/// ride along as metadata. Ownership transfers to the playback scheduler on
/// arrival and the buffer is released after playback completes.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw PCM16LE bytes.
    pub data: Vec<u8>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl AudioChunk {
    /// Creates a chunk with the stream's default format (24 kHz mono).
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            sample_rate: defaults::OUTPUT_SAMPLE_RATE,
            channels: defaults::OUTPUT_CHANNELS,
        }
    }

    /// Decodes the payload into a PCM buffer with a known duration.
    pub fn decode(&self) -> Result<PcmBuffer> {
        if self.data.is_empty() {
            return Err(AxonwatchError::Decode {
                message: "empty payload".to_string(),
            });
        }
        if self.data.len() % 2 != 0 {
            return Err(AxonwatchError::Decode {
                message: format!("odd byte length {}", self.data.len()),
            });
        }
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(AxonwatchError::Decode {
                message: format!(
                    "invalid format: {} Hz, {} channels",
                    self.sample_rate, self.channels
                ),
            });
        }

        let samples = self
            .data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Ok(PcmBuffer {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}

/// Decoded PCM audio ready for playback.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    /// Interleaved samples normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl PcmBuffer {
    /// Exact playback duration of this buffer.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / self.channels as u64;
        Duration::from_nanos(frames * 1_000_000_000 / self.sample_rate as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_le_samples() {
        let chunk = AudioChunk::new(vec![0x00, 0x40, 0x00, 0xC0]); // 16384, -16384
        let pcm = chunk.decode().unwrap();

        assert_eq!(pcm.samples.len(), 2);
        assert!((pcm.samples[0] - 0.5).abs() < 1e-4);
        assert!((pcm.samples[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(AudioChunk::new(vec![]).decode().is_err());
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(AudioChunk::new(vec![1, 2, 3]).decode().is_err());
    }

    #[test]
    fn test_decode_rejects_zero_rate() {
        let chunk = AudioChunk {
            data: vec![0, 0],
            sample_rate: 0,
            channels: 1,
        };
        assert!(chunk.decode().is_err());
    }

    #[test]
    fn test_duration_mono() {
        // 12000 frames at 24 kHz mono = 500 ms.
        let chunk = AudioChunk::new(vec![0u8; 24_000]);
        let pcm = chunk.decode().unwrap();
        assert_eq!(pcm.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_duration_accounts_for_channels() {
        let chunk = AudioChunk {
            data: vec![0u8; 24_000],
            sample_rate: 24_000,
            channels: 2,
        };
        let pcm = chunk.decode().unwrap();
        assert_eq!(pcm.duration(), Duration::from_millis(250));
    }
}
