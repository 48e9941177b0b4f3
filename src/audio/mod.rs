//! Gapless playback of streamed audio responses.
//!
//! Audio arrives from the inference session as raw PCM chunks, usually
//! faster than real time. The scheduler keeps a monotonic cursor so chunks
//! play back-to-back without gaps or overlap:
//!
//! ```text
//! AudioChunk ──▶ decode ──▶ start = max(cursor, now) ──▶ AudioSink
//!                                 │
//!                                 └──▶ cursor = start + duration
//! ```
//!
//! A chunk that fails to decode is skipped with the cursor untouched:
//! a moment of silence instead of a desynchronized stream.

pub mod chunk;
pub mod scheduler;
pub mod sink;

pub use chunk::{AudioChunk, PcmBuffer};
pub use scheduler::{Clock, PlaybackScheduler, SystemClock};
pub use sink::{AudioSink, CollectorSink};

#[cfg(feature = "cpal-audio")]
pub use sink::cpal_sink::CpalAudioSink;
