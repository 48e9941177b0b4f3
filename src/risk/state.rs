//! Risk state read-model.
//!
//! One instance per session. Mutated only through the aggregator; the
//! rendering side receives clones and never writes back.

use crate::defaults;
use crate::telemetry::event::{AlertCategory, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// Weight of the remote threat score in the composite.
const THREAT_WEIGHT: f64 = 0.45;

/// Weight of the local noise score in the composite.
const NOISE_WEIGHT: f64 = 0.55;

/// One sample of the composite-risk history chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskSample {
    pub timestamp: DateTime<Utc>,
    pub composite_risk: u8,
}

/// One entry of the anomaly activity feed.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Raw category label as reported; may be outside the known set.
    pub category: String,
    pub description: String,
    pub severity: Severity,
}

impl AnomalyEvent {
    /// Creates a feed entry stamped with the current time.
    pub fn new(category: String, description: String, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
            description,
            severity,
        }
    }

    /// Category used for feed filtering; unknown labels count as General.
    pub fn filter_category(&self) -> AlertCategory {
        AlertCategory::parse(&self.category).unwrap_or(AlertCategory::General)
    }
}

/// Aggregate risk picture for one monitoring session.
#[derive(Debug, Clone, Serialize)]
pub struct RiskState {
    threat_score: u8,
    noise_score: u8,
    signal_strength: u8,
    noise_variance: f32,
    composite_risk: u8,
    history: VecDeque<RiskSample>,
    recent_events: VecDeque<AnomalyEvent>,
    #[serde(skip)]
    history_capacity: usize,
    #[serde(skip)]
    event_capacity: usize,
}

impl RiskState {
    /// Creates an empty state with custom ring capacities.
    pub fn with_capacity(history_capacity: usize, event_capacity: usize) -> Self {
        Self {
            threat_score: 0,
            noise_score: 0,
            signal_strength: 100,
            noise_variance: 0.0,
            composite_risk: 0,
            history: VecDeque::with_capacity(history_capacity),
            recent_events: VecDeque::with_capacity(event_capacity),
            history_capacity,
            event_capacity,
        }
    }

    /// Remote threat score, 0-100.
    pub fn threat_score(&self) -> u8 {
        self.threat_score
    }

    /// Local image-noise score, 0-100.
    pub fn noise_score(&self) -> u8 {
        self.noise_score
    }

    /// Remote signal quality estimate, 0-100.
    pub fn signal_strength(&self) -> u8 {
        self.signal_strength
    }

    /// Remote mathematical-interference estimate.
    pub fn noise_variance(&self) -> f32 {
        self.noise_variance
    }

    /// Weighted composite of threat and noise, 0-100.
    pub fn composite_risk(&self) -> u8 {
        self.composite_risk
    }

    /// Composite-risk history, oldest first, at most 30 samples.
    pub fn history(&self) -> impl Iterator<Item = &RiskSample> {
        self.history.iter()
    }

    /// Anomaly feed, newest first, at most 15 entries.
    pub fn recent_events(&self) -> impl Iterator<Item = &AnomalyEvent> {
        self.recent_events.iter()
    }

    /// Inverse of the threat score, as shown in the overview panel.
    pub fn context_logic_score(&self) -> u8 {
        100 - self.threat_score
    }

    /// Inverse of the noise score, as shown in the overview panel.
    pub fn signal_health(&self) -> u8 {
        100 - self.noise_score
    }

    pub(crate) fn set_noise_score(&mut self, score: u8) {
        self.noise_score = score.min(100);
        self.recompute_composite();
    }

    pub(crate) fn set_remote_scores(&mut self, threat: u8, signal_strength: u8, variance: f32) {
        self.threat_score = threat.min(100);
        self.signal_strength = signal_strength.min(100);
        self.noise_variance = variance;
        self.recompute_composite();
    }

    pub(crate) fn zero_scores(&mut self) {
        self.threat_score = 0;
        self.noise_score = 0;
        self.recompute_composite();
    }

    pub(crate) fn push_event(&mut self, event: AnomalyEvent) {
        self.recent_events.push_front(event);
        self.recent_events.truncate(self.event_capacity);
    }

    pub(crate) fn push_history(&mut self, timestamp: DateTime<Utc>) {
        self.history.push_back(RiskSample {
            timestamp,
            composite_risk: self.composite_risk,
        });
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    fn recompute_composite(&mut self) {
        let weighted =
            self.threat_score as f64 * THREAT_WEIGHT + self.noise_score as f64 * NOISE_WEIGHT;
        self.composite_risk = weighted.round().clamp(0.0, 100.0) as u8;
    }
}

impl Default for RiskState {
    fn default() -> Self {
        Self::with_capacity(defaults::HISTORY_CAPACITY, defaults::EVENT_CAPACITY)
    }
}
