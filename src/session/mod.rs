//! Session orchestration against the remote inference stream.
//!
//! The driver owns one long-lived duplex session at a time and wires the
//! leaf components together:
//!
//! ```text
//! ┌─────────┐ frame ┌────────┐          ┌───────────────┐
//! │ Capture │──────▶│ Scorer │─────────▶│               │
//! │ Source  │   │   └────────┘          │     Risk      │──▶ snapshot
//! └─────────┘   │ jpeg                  │  Aggregator   │    (watch)
//!               ▼                       │               │
//!         ┌──────────┐  text  ┌───────┐ │               │
//!         │ Inference│───────▶│Parser │▶│               │
//!         │  Stream  │        └───────┘ └───────────────┘
//!         └──────────┘  audio ┌──────────┐
//!               └────────────▶│ Scheduler│──▶ AudioSink
//!                             └──────────┘
//! ```
//!
//! One task runs the whole loop, so risk state has exactly one writer.

pub mod capture;
pub mod driver;
pub mod scripted;
pub mod stream;

pub use capture::{CaptureSource, SyntheticCaptureSource};
pub use driver::{DriverConfig, MonitorSnapshot, SessionDriver, SessionState};
pub use scripted::{ScriptedConnector, SentFrameLog};
pub use stream::{
    FramePayload, InferenceConnector, Modality, StreamEvent, StreamPair, StreamSender, StreamSetup,
};
