//! Lane Survivor - A lane-based arcade survival game
//!
//! Core modules:
//! - `sim`: Simulation core (spawning, collisions, progression, effects)
//! - `config`: Data-driven game balance
//! - `history`: Local run-history log

pub mod config;
pub mod history;
pub mod sim;

pub use config::{ConfigError, GameConfig};
pub use history::{HistoryError, RunHistory, RunRecord, RunStats};
pub use sim::{GameEngine, GameHost};

use rand::Rng;

/// Clamp `value` into `[min, max]`.
///
/// Unlike `f32::clamp` this never panics; when `min > max` the upper bound wins.
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Uniform sample in `[min, max)`. Degenerate ranges return `min`.
#[inline]
pub fn rand_between<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    rng.random::<f32>() * (max - min) + min
}

/// World X of a lane center, shifted by `offset` lane widths
#[inline]
pub fn lane_center(config: &GameConfig, lane: usize, offset: f32) -> f32 {
    config.canvas_padding + (lane as f32 + 0.5 + offset) * config.lane_width
}

/// Weighted random draw by cumulative subtraction.
///
/// The first candidate whose running weight depletion reaches zero wins.
/// Floating point leftovers fall back to the first candidate; so does a zero
/// total weight, which is logged since it means the table is misconfigured.
pub fn pick_weighted<'a, T, R, F>(items: &'a [T], weight: F, rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f32,
{
    let first = items.first()?;
    let total: f32 = items.iter().map(&weight).sum();
    if total <= 0.0 {
        log::warn!(
            "Weighted selection over {} candidates has zero total weight, using first",
            items.len()
        );
        return Some(first);
    }

    let mut remaining = rng.random::<f32>() * total;
    for item in items {
        remaining -= weight(item);
        if remaining <= 0.0 {
            return Some(item);
        }
    }
    Some(first)
}
