//! Telemetry event types.
//!
//! One event is one unit of structured meaning extracted from the streamed
//! analysis text. Events are immutable once emitted and consumed exactly
//! once by the risk aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known alert categories reported by the inference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCategory {
    /// Stickers or patterns on signs or road markings.
    ManipulatedSign,
    /// Digital interference, pixel perturbations, camera tampering.
    ImageNoise,
    /// Objects behaving in ways that defy physics or road rules.
    LogicError,
    /// Anything that does not fit the other categories.
    General,
}

impl AlertCategory {
    /// Parses a category label, case-insensitively and whitespace-tolerant.
    ///
    /// Returns None for labels outside the known set; callers that filter
    /// must fall back to `General` for those.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "manipulated sign" => Some(Self::ManipulatedSign),
            "image noise" => Some(Self::ImageNoise),
            "logic error" => Some(Self::LogicError),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Display label matching the session's reporting vocabulary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ManipulatedSign => "Manipulated Sign",
            Self::ImageNoise => "Image Noise",
            Self::LogicError => "Logic Error",
            Self::General => "General",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity of an anomaly feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One structured event extracted from streamed analysis text.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Periodic status line with the remote model's scores.
    ScoreUpdate {
        threat: u8,
        signal_strength: u8,
        noise_variance: f32,
    },
    /// High-risk detection. The category is the raw trimmed label from the
    /// wire; unknown labels are preserved and filter as `General`.
    Alert { category: String, description: String },
    /// Routine status note.
    LogNote { description: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_categories() {
        assert_eq!(
            AlertCategory::parse("Manipulated Sign"),
            Some(AlertCategory::ManipulatedSign)
        );
        assert_eq!(
            AlertCategory::parse("image noise"),
            Some(AlertCategory::ImageNoise)
        );
        assert_eq!(
            AlertCategory::parse("LOGIC ERROR"),
            Some(AlertCategory::LogicError)
        );
        assert_eq!(AlertCategory::parse("General"), Some(AlertCategory::General));
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(
            AlertCategory::parse("  logic error  "),
            Some(AlertCategory::LogicError)
        );
    }

    #[test]
    fn test_parse_unknown_category() {
        assert_eq!(AlertCategory::parse("Sensor Drift"), None);
        assert_eq!(AlertCategory::parse(""), None);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(AlertCategory::ManipulatedSign.to_string(), "Manipulated Sign");
        assert_eq!(AlertCategory::General.to_string(), "General");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
