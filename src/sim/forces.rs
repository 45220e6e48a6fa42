//! Camera shake
//!
//! Purely cosmetic: the offset is handed to the renderer and never feeds back
//! into the simulation.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// A shake impulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeOptions {
    /// Peak displacement (world units)
    pub magnitude: f32,
    /// Settle time (ms)
    pub duration: f32,
}

impl Default for ShakeOptions {
    fn default() -> Self {
        Self {
            magnitude: 6.0,
            duration: 180.0,
        }
    }
}

/// Decaying screen shake with its own RNG stream
#[derive(Debug, Clone)]
pub struct ForceField {
    magnitude: f32,
    total_duration: f32,
    time_remaining: f32,
    offset: Vec2,
    rng: Pcg32,
}

impl ForceField {
    pub fn new(seed: u64) -> Self {
        let defaults = ShakeOptions::default();
        Self {
            magnitude: defaults.magnitude,
            total_duration: defaults.duration,
            time_remaining: 0.0,
            offset: Vec2::ZERO,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Merge an impulse into the current shake.
    ///
    /// Overlapping shakes keep the strongest magnitude and longest duration.
    /// An idle field starts fresh from the impulse.
    pub fn add_shake(&mut self, shake: ShakeOptions) {
        if self.time_remaining <= 0.0 {
            self.magnitude = shake.magnitude;
            self.total_duration = shake.duration;
        } else {
            self.magnitude = self.magnitude.max(shake.magnitude);
            self.total_duration = self.total_duration.max(shake.duration);
        }
        self.time_remaining = self.time_remaining.max(shake.duration);
    }

    pub fn update(&mut self, delta: f32) {
        if self.time_remaining <= 0.0 || self.total_duration <= 0.0 {
            self.time_remaining = 0.0;
            self.offset = Vec2::ZERO;
            return;
        }

        self.time_remaining = (self.time_remaining - delta).max(0.0);
        let progress = self.time_remaining / self.total_duration;
        let magnitude = self.magnitude * progress * progress;

        self.offset = Vec2::new(
            (self.rng.random::<f32>() * 2.0 - 1.0) * magnitude,
            (self.rng.random::<f32>() * 2.0 - 1.0) * magnitude,
        );
    }

    /// Current camera displacement
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn is_shaking(&self) -> bool {
        self.time_remaining > 0.0
    }

    pub fn reset(&mut self) {
        self.time_remaining = 0.0;
        self.offset = Vec2::ZERO;
    }
}

impl Default for ForceField {
    fn default() -> Self {
        Self::new(0)
    }
}
