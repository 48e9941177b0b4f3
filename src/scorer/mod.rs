//! Local structural-anomaly scoring for captured frames.
//!
//! A high-frequency spatial filter runs over every captured frame before it
//! is sent upstream, so the monitor keeps a local noise signal even when the
//! remote session is silent:
//!
//! ```text
//! Frame (RGBA) ──▶ luminance ──▶ Laplacian ──▶ variance ──▶ score 0-100
//!                                    │
//!                                    └──▶ per-pixel magnitude ──▶ RGBA mask
//! ```

pub mod frame;
pub mod laplacian;

pub use frame::{AnomalyResult, Frame};
pub use laplacian::{FrameScorer, ScorerConfig};
