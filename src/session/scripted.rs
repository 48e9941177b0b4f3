//! Scripted inference stream for tests and smoke sessions.
//!
//! Stands in for the real provider: inbound events come from a channel the
//! caller controls (or a canned script), and transmitted frames are recorded
//! for inspection.

use crate::error::{AxonwatchError, Result};
use crate::session::stream::{
    FramePayload, InferenceConnector, StreamEvent, StreamPair, StreamSender, StreamSetup,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Shared log of frames pushed through a scripted session.
#[derive(Clone, Default)]
pub struct SentFrameLog {
    frames: Arc<Mutex<Vec<FramePayload>>>,
    closed: Arc<Mutex<bool>>,
}

impl SentFrameLog {
    /// Number of frames transmitted so far.
    pub fn frame_count(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Snapshot of every transmitted frame.
    pub fn frames(&self) -> Vec<FramePayload> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Whether the driver closed the stream.
    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

struct RecordingSender {
    log: SentFrameLog,
}

#[async_trait::async_trait]
impl StreamSender for RecordingSender {
    async fn send_frame(&self, frame: FramePayload) -> Result<()> {
        if let Ok(mut frames) = self.log.frames.lock() {
            frames.push(frame);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Ok(mut closed) = self.log.closed.lock() {
            *closed = true;
        }
        Ok(())
    }
}

/// Connector whose single session replays caller-controlled events.
pub struct ScriptedConnector {
    events: Mutex<Option<mpsc::Receiver<StreamEvent>>>,
    log: SentFrameLog,
    fail_connect: bool,
}

impl ScriptedConnector {
    /// Creates a connector and the sending half of its event stream.
    ///
    /// The caller keeps the sender to drive the session; dropping it reads
    /// as a remote close.
    pub fn channel(buffer: usize) -> (Self, mpsc::Sender<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                events: Mutex::new(Some(rx)),
                log: SentFrameLog::default(),
                fail_connect: false,
            },
            tx,
        )
    }

    /// Creates a connector that replays a fixed script, then closes.
    pub fn scripted(script: Vec<StreamEvent>) -> Self {
        let (connector, tx) = Self::channel(script.len().max(1));
        tokio::spawn(async move {
            for event in script {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        connector
    }

    /// Creates a connector that refuses to open a session.
    pub fn failing() -> Self {
        let (mut connector, _tx) = Self::channel(1);
        connector.fail_connect = true;
        connector
    }

    /// Log of frames transmitted through this connector's session.
    pub fn frame_log(&self) -> SentFrameLog {
        self.log.clone()
    }
}

#[async_trait::async_trait]
impl InferenceConnector for ScriptedConnector {
    async fn connect(&self, _setup: StreamSetup) -> Result<StreamPair> {
        if self.fail_connect {
            return Err(AxonwatchError::Connect {
                message: "scripted connect failure".to_string(),
            });
        }

        let events = self
            .events
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .ok_or_else(|| AxonwatchError::Connect {
                message: "scripted session already consumed".to_string(),
            })?;

        Ok(StreamPair {
            sender: Arc::new(RecordingSender {
                log: self.log.clone(),
            }),
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_session_delivers_events() {
        let (connector, tx) = ScriptedConnector::channel(4);
        let mut pair = connector.connect(StreamSetup::default()).await.unwrap();

        tx.send(StreamEvent::TurnComplete).await.unwrap();
        assert!(matches!(
            pair.events.recv().await,
            Some(StreamEvent::TurnComplete)
        ));

        drop(tx);
        assert!(pair.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_sender_records_frames_and_close() {
        let (connector, _tx) = ScriptedConnector::channel(1);
        let log = connector.frame_log();
        let pair = connector.connect(StreamSetup::default()).await.unwrap();

        pair.sender
            .send_frame(FramePayload {
                bytes: vec![1, 2, 3],
                mime_type: "image/jpeg".to_string(),
            })
            .await
            .unwrap();
        pair.sender.close().await.unwrap();

        assert_eq!(log.frame_count(), 1);
        assert!(log.is_closed());
    }

    #[tokio::test]
    async fn test_scripted_session_replays_and_closes() {
        let connector = ScriptedConnector::scripted(vec![
            StreamEvent::TextDelta("scan".to_string()),
            StreamEvent::TurnComplete,
        ]);
        let mut pair = connector.connect(StreamSetup::default()).await.unwrap();

        assert!(matches!(
            pair.events.recv().await,
            Some(StreamEvent::TextDelta(_))
        ));
        assert!(matches!(
            pair.events.recv().await,
            Some(StreamEvent::TurnComplete)
        ));
        // Script exhausted: the channel closes like a remote hangup.
        assert!(pair.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_second_connect_fails() {
        let (connector, _tx) = ScriptedConnector::channel(1);
        connector.connect(StreamSetup::default()).await.unwrap();
        assert!(connector.connect(StreamSetup::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_connector() {
        let connector = ScriptedConnector::failing();
        let result = connector.connect(StreamSetup::default()).await;
        assert!(matches!(result, Err(AxonwatchError::Connect { .. })));
    }
}
