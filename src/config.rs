use crate::defaults;
use crate::error::{AxonwatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub session: SessionSettings,
    pub alerts: AlertSettings,
    pub scoring: ScoringSettings,
    pub audio: AudioSettings,
}

/// Capture and transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub frame_cadence_hz: f64,
    pub encode_quality: f32,
}

/// Alert threshold configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertSettings {
    pub threat_threshold: u8,
    pub noise_threshold: u8,
}

/// Local frame scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    pub variance_divisor: f64,
    pub emit_mask: bool,
}

/// Playback audio configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frame_cadence_hz: defaults::FRAME_CADENCE_HZ,
            encode_quality: defaults::ENCODE_QUALITY,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            threat_threshold: defaults::THREAT_THRESHOLD,
            noise_threshold: defaults::NOISE_THRESHOLD,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            variance_divisor: defaults::VARIANCE_DIVISOR,
            emit_mask: true,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: defaults::OUTPUT_SAMPLE_RATE,
            channels: defaults::OUTPUT_CHANNELS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - AXONWATCH_THREAT_THRESHOLD → alerts.threat_threshold
    /// - AXONWATCH_NOISE_THRESHOLD → alerts.noise_threshold
    /// - AXONWATCH_CADENCE_HZ → session.frame_cadence_hz
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("AXONWATCH_THREAT_THRESHOLD")
            && let Ok(threshold) = value.parse::<u8>()
        {
            self.alerts.threat_threshold = threshold;
        }

        if let Ok(value) = std::env::var("AXONWATCH_NOISE_THRESHOLD")
            && let Ok(threshold) = value.parse::<u8>()
        {
            self.alerts.noise_threshold = threshold;
        }

        if let Ok(value) = std::env::var("AXONWATCH_CADENCE_HZ")
            && let Ok(cadence) = value.parse::<f64>()
        {
            self.session.frame_cadence_hz = cadence;
        }

        self
    }

    /// Validate ranges on every tunable value.
    ///
    /// Thresholds are percentages, cadence must be positive, and encode
    /// quality is a 0.0-1.0 fraction.
    pub fn validate(&self) -> Result<()> {
        if self.alerts.threat_threshold > 100 {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "alerts.threat_threshold".to_string(),
                message: "must be between 0 and 100".to_string(),
            });
        }
        if self.alerts.noise_threshold > 100 {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "alerts.noise_threshold".to_string(),
                message: "must be between 0 and 100".to_string(),
            });
        }
        if !self.session.frame_cadence_hz.is_finite() || self.session.frame_cadence_hz <= 0.0 {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "session.frame_cadence_hz".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.session.encode_quality) {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "session.encode_quality".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if !self.scoring.variance_divisor.is_finite() || self.scoring.variance_divisor <= 0.0 {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "scoring.variance_divisor".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.channels == 0 {
            return Err(AxonwatchError::ConfigInvalidValue {
                key: "audio.channels".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/axonwatch/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("axonwatch").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_matches_shared_constants() {
        let config = Config::default();
        assert_eq!(config.session.frame_cadence_hz, defaults::FRAME_CADENCE_HZ);
        assert_eq!(config.session.encode_quality, defaults::ENCODE_QUALITY);
        assert_eq!(config.alerts.threat_threshold, defaults::THREAT_THRESHOLD);
        assert_eq!(config.alerts.noise_threshold, defaults::NOISE_THRESHOLD);
        assert_eq!(config.scoring.variance_divisor, defaults::VARIANCE_DIVISOR);
        assert!(config.scoring.emit_mask);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_uses_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[alerts]\nthreat_threshold = 65").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.alerts.threat_threshold, 65);
        assert_eq!(config.alerts.noise_threshold, defaults::NOISE_THRESHOLD);
        assert_eq!(config.session.frame_cadence_hz, defaults::FRAME_CADENCE_HZ);
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alerts = [not toml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let path = Path::new("/nonexistent/axonwatch/config.toml");
        let config = Config::load_or_default(path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.alerts.threat_threshold = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cadence() {
        let mut config = Config::default();
        config.session.frame_cadence_hz = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_quality_above_one() {
        let mut config = Config::default();
        config.session.encode_quality = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }
}
