//! Error types for axonwatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AxonwatchError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Session lifecycle errors (the only user-visible failures)
    #[error("Failed to open inference session: {message}")]
    Connect { message: String },

    #[error("Inference stream failed: {message}")]
    Stream { message: String },

    // Frame handling errors
    #[error("Frame dimension mismatch: expected {expected} bytes, got {actual}")]
    FrameDimensions { expected: usize, actual: usize },

    #[error("Frame capture failed: {message}")]
    Capture { message: String },

    #[error("Frame encoding failed: {message}")]
    Encode { message: String },

    // Audio errors (internal, never surfaced to the session)
    #[error("Audio chunk decode failed: {message}")]
    Decode { message: String },

    #[error("Audio output unavailable: {message}")]
    AudioOutput { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, AxonwatchError>;
