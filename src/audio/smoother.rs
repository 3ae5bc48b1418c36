//! Exponential moving average of the raw level

use crate::constants::{SMOOTHING_DECAY, SMOOTHING_GAIN};

/// Smoothed loudness carried across cycles.
///
/// Owned by the stream loop; `smoothed = 0.8 * previous + 0.2 * raw`,
/// starting from zero. No clamping is applied.
#[derive(Debug, Clone, Default)]
pub struct LevelSmoother {
    previous: f64,
    updates: u64,
}

impl LevelSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one raw level and return the new smoothed level
    pub fn update(&mut self, raw_level: f64) -> f64 {
        self.previous = SMOOTHING_DECAY * self.previous + SMOOTHING_GAIN * raw_level;
        self.updates += 1;
        self.previous
    }

    /// Current smoothed level
    pub fn level(&self) -> f64 {
        self.previous
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }
}
