//! Dual-threshold detection with per-phrase debounce
//!
//! A phrase fires when its moving average exceeds the low threshold
//! (sustained activity) or the instantaneous score exceeds the high threshold
//! (a single strong spike). After firing, the phrase cools down for the
//! debounce interval; fire-worthy observations during cooldown are dropped.

use std::time::{Duration, Instant};

use crate::config::DetectionConfig;

/// Debounce state of one phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeciderState {
    /// No detection within the debounce interval
    Idle,
    /// Within the debounce interval of the last detection
    Cooling,
}

/// Outcome of one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Emit a detection event
    Fire {
        /// Time since the previous detection of this phrase
        since_last: Option<Duration>,
    },
    /// Fire-worthy but suppressed by debounce
    Debounced {
        /// Time since the previous detection of this phrase
        since_last: Duration,
    },
    /// Below both thresholds but within the near-miss margin
    NearMiss,
    /// Below both thresholds
    Quiet,
}

impl Decision {
    /// Whether this decision emits an event
    #[must_use]
    pub const fn fired(&self) -> bool {
        matches!(self, Self::Fire { .. })
    }
}

/// Threshold and debounce policy, with independent clocks per phrase
///
/// Phrases are addressed by their position in the configured phrase list.
#[derive(Debug, Clone)]
pub struct DetectionDecider {
    low_threshold: f32,
    high_threshold: f32,
    near_miss_margin: f32,
    debounce: Duration,
    last_fired: Vec<Option<Instant>>,
}

impl DetectionDecider {
    /// Create a decider from the detection configuration
    #[must_use]
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            low_threshold: config.low_threshold,
            high_threshold: config.high_threshold,
            near_miss_margin: config.near_miss_margin,
            debounce: config.debounce,
            last_fired: vec![None; config.phrases.len()],
        }
    }

    /// Whether a score/average pair crosses either threshold
    #[must_use]
    pub fn should_fire(&self, score: f32, average: f32) -> bool {
        average > self.low_threshold || score > self.high_threshold
    }

    /// Decide on one observation for phrase `index` at time `now`
    ///
    /// Firing restarts the phrase's debounce clock. The caller is responsible
    /// for clearing the phrase's score window when this returns `Fire`. An
    /// index outside the configured phrases never fires.
    pub fn decide(&mut self, index: usize, score: f32, average: f32, now: Instant) -> Decision {
        if !self.should_fire(score, average) {
            let near = average > self.low_threshold - self.near_miss_margin
                || score > self.high_threshold - self.near_miss_margin;
            return if near { Decision::NearMiss } else { Decision::Quiet };
        }

        let Some(last_fired) = self.last_fired.get_mut(index) else {
            return Decision::Quiet;
        };
        let since_last = last_fired.map(|last| now.saturating_duration_since(last));

        match since_last {
            Some(elapsed) if elapsed < self.debounce => Decision::Debounced { since_last: elapsed },
            _ => {
                *last_fired = Some(now);
                Decision::Fire { since_last }
            }
        }
    }

    /// Debounce state of phrase `index` at time `now`
    #[must_use]
    pub fn state(&self, index: usize, now: Instant) -> DeciderState {
        match self.last_fired.get(index).copied().flatten() {
            Some(last) if now.saturating_duration_since(last) < self.debounce => DeciderState::Cooling,
            _ => DeciderState::Idle,
        }
    }

    /// Low (moving-average) threshold
    #[must_use]
    pub const fn low_threshold(&self) -> f32 {
        self.low_threshold
    }

    /// High (single-frame) threshold
    #[must_use]
    pub const fn high_threshold(&self) -> f32 {
        self.high_threshold
    }
}
