//! Capture source collaborator interface.

use crate::defaults;
use crate::error::Result;
use crate::scorer::frame::Frame;

/// Trait for frame sources.
///
/// How frames are acquired (live camera, looped file) is the collaborator's
/// concern; the driver only requires that a fixed-resolution frame is
/// available at call time. Implementations are polled once per cadence tick.
pub trait CaptureSource: Send {
    /// Captures the current frame.
    fn capture(&mut self) -> Result<Frame>;
}

/// Deterministic frame generator for tests and smoke sessions.
///
/// Produces flat mid-gray frames, optionally replacing every Nth frame with
/// a high-frequency checker pattern so the scorer has something to find.
pub struct SyntheticCaptureSource {
    width: u32,
    height: u32,
    interference_period: Option<u64>,
    ticks: u64,
}

impl SyntheticCaptureSource {
    /// Creates a source producing flat frames at the transport resolution.
    pub fn new() -> Self {
        Self {
            width: defaults::FRAME_WIDTH,
            height: defaults::FRAME_HEIGHT,
            interference_period: None,
            ticks: 0,
        }
    }

    /// Creates a source with custom dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            interference_period: None,
            ticks: 0,
        }
    }

    /// Replaces every `period`-th frame with a checker pattern.
    pub fn with_interference(mut self, period: u64) -> Self {
        self.interference_period = Some(period.max(1));
        self
    }

    fn checker_frame(&self) -> Frame {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let value = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[value, value, value, 255]);
            }
        }
        // Dimensions are consistent with the buffer just built.
        Frame::new(self.width, self.height, data).unwrap_or_else(|_| {
            Frame::uniform(self.width, self.height, 127, 127, 127)
        })
    }
}

impl CaptureSource for SyntheticCaptureSource {
    fn capture(&mut self) -> Result<Frame> {
        self.ticks += 1;
        let interference = self
            .interference_period
            .is_some_and(|period| self.ticks % period == 0);
        if interference {
            Ok(self.checker_frame())
        } else {
            Ok(Frame::uniform(self.width, self.height, 127, 127, 127))
        }
    }
}

impl Default for SyntheticCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}
