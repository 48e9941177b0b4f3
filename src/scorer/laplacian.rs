//! Laplacian convolution scorer.
//!
//! Isolates high-frequency structure with a discrete Laplacian kernel and
//! maps the variance of the response to a bounded anomaly score. Adversarial
//! patches and injected pixel noise concentrate energy in exactly this band.

use crate::defaults;
use crate::scorer::frame::{AnomalyResult, Frame};

/// Discrete Laplacian kernel, output zero-padded to the source size.
///
/// ```text
/// [  0 -1  0 ]
/// [ -1  4 -1 ]
/// [  0 -1  0 ]
/// ```
///
/// The kernel is applied where its 3x3 support fits; the one-pixel output
/// border stays zero. A flat frame therefore produces a flat-zero response
/// instead of a phantom edge along the frame boundary.
const KERNEL_CENTER: f32 = 4.0;

/// Gain applied to the absolute Laplacian response for the mask.
const MASK_GAIN: f32 = 5.0;

/// Configuration for the frame scorer.
#[derive(Debug, Clone, Copy)]
pub struct ScorerConfig {
    /// Calibration divisor mapping response variance to the 0-100 range.
    pub variance_divisor: f64,
    /// Whether to build the RGBA visualization mask.
    pub emit_mask: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            variance_divisor: defaults::VARIANCE_DIVISOR,
            emit_mask: true,
        }
    }
}

/// Stateless frame scorer.
///
/// `analyze` is deterministic and side-effect free; the caller serializes
/// invocations (one per cadence tick).
#[derive(Debug, Clone)]
pub struct FrameScorer {
    config: ScorerConfig,
}

impl FrameScorer {
    /// Creates a scorer with default configuration.
    pub fn new() -> Self {
        Self::with_config(ScorerConfig::default())
    }

    /// Creates a scorer with custom configuration.
    pub fn with_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Scores a frame and builds its visualization mask.
    pub fn analyze(&self, frame: &Frame) -> AnomalyResult {
        let luminance = frame.luminance();
        let response = laplacian(&luminance, frame.width() as usize, frame.height() as usize);
        let score = self.score_from_variance(variance(&response));
        let mask = self.config.emit_mask.then(|| build_mask(&response));
        AnomalyResult { score, mask }
    }

    fn score_from_variance(&self, variance: f64) -> u8 {
        let scaled = variance / self.config.variance_divisor * 100.0;
        scaled.round().clamp(0.0, 100.0) as u8
    }
}

impl Default for FrameScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the Laplacian kernel, zero-padding the output to the source size.
fn laplacian(luminance: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; luminance.len()];
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            let center = luminance[i] * KERNEL_CENTER;
            let neighbors =
                luminance[i - width] + luminance[i - 1] + luminance[i + 1] + luminance[i + width];
            out[i] = center - neighbors;
        }
    }
    out
}

/// Population variance of the convolution response.
fn variance(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// RGBA mask where response magnitude drives green/blue and alpha.
///
/// Per pixel, with `mag = clamp(|response| * 5, 0, 255)`:
/// R = 0, G = mag, B = mag / 2, A = mag * 0.8.
fn build_mask(response: &[f32]) -> Vec<u8> {
    let mut mask = Vec::with_capacity(response.len() * 4);
    for &value in response {
        let mag = (value.abs() * MASK_GAIN).clamp(0.0, 255.0);
        mask.push(0);
        mask.push(mag.round() as u8);
        mask.push((mag / 2.0).round() as u8);
        mask.push((mag * 0.8).round() as u8);
    }
    mask
}
