//! Incremental parsing of streamed analysis text into telemetry events.
//!
//! The inference session reports through free-form text carrying inline
//! markers. The parser turns the raw character stream into typed events:
//!
//! ```text
//! text chunks ──▶ carry buffer ──▶ [AXON_UPDATE] ──▶ ScoreUpdate
//!                      │           [ALERT: ...]  ──▶ Alert
//!                      │           [LOG]         ──▶ LogNote
//!                      └──▶ display tail (last 350 chars, reset per turn)
//! ```
//!
//! Markers split across chunk boundaries are buffered until complete.
//! Threshold policy lives in the risk aggregator, not here; the parser only
//! reports what the stream actually said.

pub mod event;
pub mod parser;

pub use event::{AlertCategory, Severity, TelemetryEvent};
pub use parser::{ParserConfig, TelemetryParser};
