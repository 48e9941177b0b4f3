//! Risk aggregation and threshold alert policy.

use crate::defaults;
use crate::risk::state::{AnomalyEvent, RiskState};
use crate::scorer::frame::AnomalyResult;
use crate::telemetry::event::{AlertCategory, Severity, TelemetryEvent};
use chrono::{DateTime, Utc};

/// Configuration for the risk aggregator.
#[derive(Debug, Clone, Copy)]
pub struct RiskConfig {
    /// Remote threat score at or above this raises an automatic alert.
    pub threat_threshold: u8,
    /// Local noise score at or above this raises a spectral alert.
    pub noise_threshold: u8,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            threat_threshold: defaults::THREAT_THRESHOLD,
            noise_threshold: defaults::NOISE_THRESHOLD,
        }
    }
}

/// Sole owner and writer of [`RiskState`].
///
/// Threshold alerts are edge-triggered: each fires on the transition from
/// below to at-or-above its threshold and re-arms only after the score
/// falls back below. A score that stays high does not spam the feed.
pub struct RiskAggregator {
    config: RiskConfig,
    state: RiskState,
    connected: bool,
    threat_latched: bool,
    noise_latched: bool,
}

impl RiskAggregator {
    /// Creates an aggregator with default thresholds.
    pub fn new() -> Self {
        Self::with_config(RiskConfig::default())
    }

    /// Creates an aggregator with custom thresholds.
    pub fn with_config(config: RiskConfig) -> Self {
        Self {
            config,
            state: RiskState::default(),
            connected: false,
            threat_latched: false,
            noise_latched: false,
        }
    }

    /// Applies a local frame score.
    pub fn apply_anomaly_result(&mut self, result: &AnomalyResult) {
        self.state.set_noise_score(result.score);

        let above = result.score >= self.config.noise_threshold;
        if above && !self.noise_latched {
            self.noise_latched = true;
            self.state.push_event(AnomalyEvent::new(
                AlertCategory::ImageNoise.label().to_string(),
                format!(
                    "Spectral anomaly: image noise exceeded safety threshold ({}%)",
                    result.score
                ),
                Severity::Critical,
            ));
        } else if !above {
            self.noise_latched = false;
        }
    }

    /// Applies one parsed telemetry event.
    pub fn apply_telemetry_event(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::ScoreUpdate {
                threat,
                signal_strength,
                noise_variance,
            } => {
                self.state
                    .set_remote_scores(threat, signal_strength, noise_variance);

                let above = threat >= self.config.threat_threshold;
                if above && !self.threat_latched {
                    self.threat_latched = true;
                    self.state.push_event(AnomalyEvent::new(
                        AlertCategory::LogicError.label().to_string(),
                        format!(
                            "Automatic detection: high risk movement or object identified ({}%)",
                            threat
                        ),
                        Severity::Critical,
                    ));
                } else if !above {
                    self.threat_latched = false;
                }
            }
            TelemetryEvent::Alert {
                category,
                description,
            } => {
                self.state
                    .push_event(AnomalyEvent::new(category, description, Severity::Critical));
            }
            TelemetryEvent::LogNote { description } => {
                self.state.push_event(AnomalyEvent::new(
                    AlertCategory::General.label().to_string(),
                    description,
                    Severity::Low,
                ));
            }
        }
    }

    /// Samples the composite risk into the history ring.
    ///
    /// A no-op while disconnected so the chart does not flatline with
    /// stale zeros between sessions.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.connected {
            self.state.push_history(now);
        }
    }

    /// Marks the session connected or disconnected.
    ///
    /// Disconnecting zeroes the live scores and re-arms both alert latches.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if !connected {
            self.state.zero_scores();
            self.threat_latched = false;
            self.noise_latched = false;
        }
    }

    /// Whether a session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Updates thresholds at runtime (from the rendering collaborator).
    pub fn set_thresholds(&mut self, threat_threshold: u8, noise_threshold: u8) {
        self.config.threat_threshold = threat_threshold;
        self.config.noise_threshold = noise_threshold;
    }

    /// Read access for in-process consumers.
    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Clone of the current state for publication.
    pub fn snapshot(&self) -> RiskState {
        self.state.clone()
    }
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self::new()
    }
}
