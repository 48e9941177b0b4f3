//! Session driver: the single owner of a live monitoring session.
//!
//! One task per session runs the whole loop; the capture tick, scorer
//! results and inbound stream events are all funneled through it, so risk
//! state never sees concurrent writers. Scoring runs on a blocking worker
//! tagged with a capture sequence number; a result that arrives after a
//! newer frame was captured is dropped, so the noise score always reflects
//! the most recently captured frame.

use crate::audio::scheduler::PlaybackScheduler;
use crate::audio::sink::AudioSink;
use crate::config::Config;
use crate::defaults;
use crate::error::{AxonwatchError, Result};
use crate::risk::aggregator::{RiskAggregator, RiskConfig};
use crate::risk::state::RiskState;
use crate::scorer::frame::Frame;
use crate::scorer::laplacian::{FrameScorer, ScorerConfig};
use crate::session::capture::CaptureSource;
use crate::session::stream::{
    FramePayload, InferenceConnector, StreamEvent, StreamSender, StreamSetup,
};
use crate::telemetry::parser::TelemetryParser;
use chrono::Utc;
use image::ImageEncoder;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Failed,
}

/// Configuration for the session driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Frame capture cadence in Hz.
    pub frame_cadence_hz: f64,
    /// JPEG quality for transmitted frames, 0.0 to 1.0.
    pub encode_quality: f32,
    /// Session setup sent to the inference service on open.
    pub setup: StreamSetup,
    /// Local scorer configuration.
    pub scorer: ScorerConfig,
    /// Aggregator thresholds.
    pub risk: RiskConfig,
    /// Interval between history samples.
    pub history_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_cadence_hz: defaults::FRAME_CADENCE_HZ,
            encode_quality: defaults::ENCODE_QUALITY,
            setup: StreamSetup::default(),
            scorer: ScorerConfig::default(),
            risk: RiskConfig::default(),
            history_interval: Duration::from_secs(1),
        }
    }
}

impl DriverConfig {
    /// Builds a driver configuration from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            frame_cadence_hz: config.session.frame_cadence_hz,
            encode_quality: config.session.encode_quality,
            setup: StreamSetup::default(),
            scorer: ScorerConfig {
                variance_divisor: config.scoring.variance_divisor,
                emit_mask: config.scoring.emit_mask,
            },
            risk: RiskConfig {
                threat_threshold: config.alerts.threat_threshold,
                noise_threshold: config.alerts.noise_threshold,
            },
            history_interval: Duration::from_secs(1),
        }
    }

    fn cadence_period(&self) -> Duration {
        let hz = if self.frame_cadence_hz.is_finite() && self.frame_cadence_hz > 0.0 {
            self.frame_cadence_hz
        } else {
            defaults::FRAME_CADENCE_HZ
        };
        Duration::from_secs_f64(1.0 / hz)
    }
}

/// Read-only view published to the rendering collaborator after every
/// mutation.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub session_state: SessionState,
    pub risk: RiskState,
    /// Latest scorer visualization mask, RGBA at frame resolution.
    pub mask: Option<Vec<u8>>,
    /// Tail of the streamed analysis text.
    pub display_text: String,
    /// Connect or stream failure, when the state is Failed.
    pub error: Option<String>,
}

impl Default for MonitorSnapshot {
    fn default() -> Self {
        Self {
            session_state: SessionState::Idle,
            risk: RiskState::default(),
            mask: None,
            display_text: String::new(),
            error: None,
        }
    }
}

/// Handle to the running session task.
struct ActiveSession {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Orchestrates capture, scoring, transmission, telemetry and playback for
/// one session at a time.
pub struct SessionDriver {
    config: DriverConfig,
    connector: Arc<dyn InferenceConnector>,
    aggregator: Arc<Mutex<RiskAggregator>>,
    snapshot_tx: Arc<watch::Sender<MonitorSnapshot>>,
    session: Option<ActiveSession>,
}

impl SessionDriver {
    /// Creates a driver for the given inference connector.
    pub fn new(config: DriverConfig, connector: Arc<dyn InferenceConnector>) -> Self {
        let aggregator = RiskAggregator::with_config(config.risk);
        let (snapshot_tx, _) = watch::channel(MonitorSnapshot::default());
        Self {
            config,
            connector,
            aggregator: Arc::new(Mutex::new(aggregator)),
            snapshot_tx: Arc::new(snapshot_tx),
            session: None,
        }
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.snapshot_tx.borrow().session_state
    }

    /// Updates alert thresholds at runtime.
    pub fn set_thresholds(&self, threat_threshold: u8, noise_threshold: u8) {
        lock_aggregator(&self.aggregator).set_thresholds(threat_threshold, noise_threshold);
    }

    /// Opens a session and starts the capture loop.
    ///
    /// At most one session is open at a time: an existing session is
    /// force-closed first. A connect failure surfaces as `Failed`; the
    /// caller may retry.
    pub async fn connect(
        &mut self,
        capture: Box<dyn CaptureSource>,
        sink: Box<dyn AudioSink>,
    ) -> Result<()> {
        self.stop().await;

        self.publish_state(SessionState::Connecting, None);
        let pair = match self.connector.connect(self.config.setup.clone()).await {
            Ok(pair) => pair,
            Err(e) => {
                let message = e.to_string();
                self.publish_state(SessionState::Failed, Some(message.clone()));
                return Err(AxonwatchError::Connect { message });
            }
        };

        lock_aggregator(&self.aggregator).set_connected(true);
        self.publish_state(SessionState::Open, None);

        let (stop_tx, stop_rx) = mpsc::channel(1);
        let loop_ctx = SessionLoop {
            config: self.config.clone(),
            aggregator: self.aggregator.clone(),
            snapshot_tx: self.snapshot_tx.clone(),
            parser: TelemetryParser::new(),
            scheduler: PlaybackScheduler::new(sink),
            scorer: FrameScorer::with_config(self.config.scorer),
            capture,
            sender: pair.sender,
            mask: None,
        };
        let task = tokio::spawn(loop_ctx.run(pair.events, stop_rx));
        self.session = Some(ActiveSession { stop_tx, task });
        Ok(())
    }

    /// Stops the current session, if any, and waits for its task to finish.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.stop_tx.send(()).await;
            let _ = session.task.await;
        }
    }

    fn publish_state(&self, state: SessionState, error: Option<String>) {
        let aggregator = lock_aggregator(&self.aggregator);
        self.snapshot_tx.send_replace(MonitorSnapshot {
            session_state: state,
            risk: aggregator.snapshot(),
            mask: None,
            display_text: String::new(),
            error,
        });
    }
}

fn lock_aggregator(aggregator: &Arc<Mutex<RiskAggregator>>) -> MutexGuard<'_, RiskAggregator> {
    aggregator
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State owned by the per-session loop task.
struct SessionLoop {
    config: DriverConfig,
    aggregator: Arc<Mutex<RiskAggregator>>,
    snapshot_tx: Arc<watch::Sender<MonitorSnapshot>>,
    parser: TelemetryParser,
    scheduler: PlaybackScheduler,
    scorer: FrameScorer,
    capture: Box<dyn CaptureSource>,
    sender: Arc<dyn StreamSender>,
    mask: Option<Vec<u8>>,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<StreamEvent>,
        mut stop_rx: mpsc::Receiver<()>,
    ) {
        let mut capture_interval = tokio::time::interval(self.config.cadence_period());
        capture_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut history_interval = tokio::time::interval(self.config.history_interval);
        history_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Scorer results come back tagged with the capture sequence they
        // belong to; only the most recent capture's result is applied.
        let (score_tx, mut score_rx) = mpsc::channel::<(u64, crate::scorer::AnomalyResult)>(4);
        let mut capture_seq: u64 = 0;

        let final_state = loop {
            tokio::select! {
                _ = capture_interval.tick() => {
                    capture_seq += 1;
                    self.on_capture_tick(capture_seq, &score_tx);
                }
                Some((seq, result)) = score_rx.recv() => {
                    if seq == capture_seq {
                        self.mask = result.mask.clone();
                        lock_aggregator(&self.aggregator).apply_anomaly_result(&result);
                        self.publish(SessionState::Open, None);
                    } else {
                        log::debug!("dropping stale score for frame {} (latest {})", seq, capture_seq);
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(StreamEvent::TextDelta(text)) => {
                            let parsed = self.parser.feed(&text);
                            if !parsed.is_empty() {
                                let mut aggregator = lock_aggregator(&self.aggregator);
                                for telemetry_event in parsed {
                                    aggregator.apply_telemetry_event(telemetry_event);
                                }
                            }
                            self.publish(SessionState::Open, None);
                        }
                        Some(StreamEvent::Audio(chunk)) => {
                            if let Err(e) = self.scheduler.enqueue(chunk) {
                                log::warn!("audio scheduling failed: {}", e);
                            }
                        }
                        Some(StreamEvent::TurnComplete) => {
                            self.parser.reset_display();
                            self.publish(SessionState::Open, None);
                        }
                        Some(StreamEvent::Error(message)) => {
                            log::warn!("inference stream failed: {}", message);
                            break (SessionState::Failed, Some(message));
                        }
                        Some(StreamEvent::Closed) | None => {
                            break (SessionState::Closed, None);
                        }
                    }
                }
                _ = history_interval.tick() => {
                    lock_aggregator(&self.aggregator).tick(Utc::now());
                    self.publish(SessionState::Open, None);
                }
                _ = stop_rx.recv() => {
                    self.publish(SessionState::Closing, None);
                    if let Err(e) = self.sender.close().await {
                        log::warn!("stream close failed: {}", e);
                    }
                    break (SessionState::Closed, None);
                }
            }
        };

        // Teardown: live scores are zeroed and the capture loop ends with
        // this task. Scheduled audio is allowed to drain in the sink.
        lock_aggregator(&self.aggregator).set_connected(false);
        self.mask = None;
        let (state, error) = final_state;
        self.publish(state, error);
    }

    /// Captures one frame, dispatches scoring and fire-and-forget transmit.
    fn on_capture_tick(
        &mut self,
        seq: u64,
        score_tx: &mpsc::Sender<(u64, crate::scorer::AnomalyResult)>,
    ) {
        let frame = match self.capture.capture() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("frame capture failed: {}", e);
                return;
            }
        };

        let scorer = self.scorer.clone();
        let score_tx = score_tx.clone();
        let score_frame = frame.clone();
        tokio::task::spawn_blocking(move || {
            let result = scorer.analyze(&score_frame);
            let _ = score_tx.blocking_send((seq, result));
        });

        // Transmission must not delay the next tick; encode and send on
        // their own tasks and drop failures after logging.
        let sender = self.sender.clone();
        let quality = self.config.encode_quality;
        tokio::spawn(async move {
            let encoded =
                tokio::task::spawn_blocking(move || encode_frame(&frame, quality)).await;
            match encoded {
                Ok(Ok(payload)) => {
                    if let Err(e) = sender.send_frame(payload).await {
                        log::warn!("frame transmit failed: {}", e);
                    }
                }
                Ok(Err(e)) => log::warn!("frame encode failed: {}", e),
                Err(e) => log::warn!("frame encode task failed: {}", e),
            }
        });
    }

    fn publish(&self, state: SessionState, error: Option<String>) {
        let risk = lock_aggregator(&self.aggregator).snapshot();
        self.snapshot_tx.send_replace(MonitorSnapshot {
            session_state: state,
            risk,
            mask: self.mask.clone(),
            display_text: self.parser.display_text().to_string(),
            error,
        });
    }
}

/// Encodes a frame as JPEG at the given quality fraction.
fn encode_frame(frame: &Frame, quality: f32) -> Result<FramePayload> {
    // JPEG has no alpha channel; strip it before encoding.
    let rgb: Vec<u8> = frame
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
    let mut bytes = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .write_image(
            &rgb,
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| AxonwatchError::Encode {
            message: e.to_string(),
        })?;

    Ok(FramePayload {
        bytes,
        mime_type: defaults::FRAME_MIME_TYPE.to_string(),
    })
}
