//! axonwatch - Real-time anomaly monitoring for streamed vehicle footage
//!
//! Scores frames locally, streams them to a remote inference session, and
//! folds both signals into one composite risk picture with gapless audio
//! feedback.

// Enforce error handling discipline in library code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod risk;
pub mod scorer;
pub mod session;
pub mod telemetry;

// Core seams (capture → score → stream → aggregate → render)
pub use audio::{AudioChunk, AudioSink, CollectorSink, PlaybackScheduler};
pub use scorer::{AnomalyResult, Frame, FrameScorer, ScorerConfig};
pub use session::{
    CaptureSource, DriverConfig, InferenceConnector, MonitorSnapshot, SessionDriver, SessionState,
    StreamEvent, StreamSetup,
};
pub use telemetry::{TelemetryEvent, TelemetryParser};

// Aggregation
pub use risk::{AnomalyEvent, RiskAggregator, RiskConfig, RiskState};

// Error handling
pub use error::{AxonwatchError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
