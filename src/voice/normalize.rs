//! Quiet-frame amplitude boost
//!
//! Only very quiet frames are boosted. Frames already at a reasonable level
//! pass through untouched so the scoring engine sees its expected input
//! distribution.

use crate::config::NormalizeConfig;

use super::frame::Frame;

/// Boosts frames whose peak falls below a quiet threshold
#[derive(Debug, Clone)]
pub struct Normalizer {
    quiet_threshold: u16,
    target_peak: f32,
    max_gain: f32,
}

impl Normalizer {
    /// Create a normalizer from configuration
    #[must_use]
    pub const fn new(config: &NormalizeConfig) -> Self {
        Self {
            quiet_threshold: config.quiet_threshold,
            target_peak: config.target_peak,
            max_gain: config.max_gain,
        }
    }

    /// Gain that would be applied to a frame with this peak, if any
    #[must_use]
    pub fn gain_for_peak(&self, peak: u16) -> Option<f32> {
        if peak == 0 || peak >= self.quiet_threshold {
            return None;
        }
        Some((self.target_peak / f32::from(peak)).min(self.max_gain))
    }

    /// Boost a quiet frame; silence and loud frames are returned unchanged
    #[must_use]
    pub fn normalize(&self, frame: Frame) -> Frame {
        let Some(gain) = self.gain_for_peak(frame.peak()) else {
            return frame;
        };

        tracing::trace!(peak = frame.peak(), gain, "boosting quiet frame");

        let samples = frame
            .into_samples()
            .into_iter()
            .map(|s| apply_gain(s, gain))
            .collect();
        Frame::new(samples)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizeConfig::default())
    }
}

/// Scale one sample, clamped to the 16-bit range
#[allow(clippy::cast_possible_truncation)]
fn apply_gain(sample: i16, gain: f32) -> i16 {
    (f32::from(sample) * gain).clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}
