//! Inference stream collaborator interface.
//!
//! The remote service is an opaque duplex stream: encoded frames go up,
//! typed events come down. Transport and auth live behind these traits.

use crate::audio::chunk::AudioChunk;
use crate::defaults;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Response modalities requested on session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Audio,
    Text,
}

/// Configuration sent to the inference service when a session opens.
#[derive(Debug, Clone)]
pub struct StreamSetup {
    pub system_prompt: String,
    pub response_modalities: Vec<Modality>,
    pub transcription_enabled: bool,
}

impl Default for StreamSetup {
    fn default() -> Self {
        Self {
            system_prompt: defaults::SYSTEM_INSTRUCTION.to_string(),
            response_modalities: vec![Modality::Audio],
            transcription_enabled: true,
        }
    }
}

/// One encoded frame ready for transmission.
#[derive(Debug, Clone)]
pub struct FramePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Events emitted by an open inference stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Fragment of streamed analysis text.
    TextDelta(String),
    /// Audio response payload.
    Audio(AudioChunk),
    /// The model finished its current turn.
    TurnComplete,
    /// The remote side closed the stream.
    Closed,
    /// Mid-session stream failure.
    Error(String),
}

/// Sending half of an open duplex stream.
///
/// Shared behind an `Arc` so frame transmission can be dispatched
/// fire-and-forget without blocking the capture tick.
#[async_trait::async_trait]
pub trait StreamSender: Send + Sync {
    /// Transmits one encoded frame.
    async fn send_frame(&self, frame: FramePayload) -> Result<()>;

    /// Closes the stream; no further events are honored afterwards.
    async fn close(&self) -> Result<()>;
}

/// An open duplex stream: the sending half plus the inbound event channel.
pub struct StreamPair {
    pub sender: Arc<dyn StreamSender>,
    pub events: mpsc::Receiver<StreamEvent>,
}

/// Factory that opens duplex streams to the inference service.
#[async_trait::async_trait]
pub trait InferenceConnector: Send + Sync {
    /// Opens a session configured with `setup`.
    async fn connect(&self, setup: StreamSetup) -> Result<StreamPair>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_setup_requests_audio_with_transcription() {
        let setup = StreamSetup::default();
        assert_eq!(setup.response_modalities, vec![Modality::Audio]);
        assert!(setup.transcription_enabled);
        assert!(setup.system_prompt.contains("AXON.SEC"));
    }
}
