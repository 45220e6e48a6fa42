//! Frame clock
//!
//! Turns host timestamps into simulation steps. Long gaps (a backgrounded tab,
//! a debugger pause) are dropped rather than fast-forwarded: a step never
//! exceeds `max_step`.

#[derive(Debug, Clone)]
pub struct FrameClock {
    last_time: Option<f64>,
    max_step: f32,
}

impl FrameClock {
    pub fn new(max_step: f32) -> Self {
        Self {
            last_time: None,
            max_step,
        }
    }

    /// Sample the host clock and return the step to simulate (ms).
    ///
    /// The first sample after construction or `reset` yields zero. Time going
    /// backwards is treated as no time passing.
    pub fn advance(&mut self, now: f64) -> f32 {
        let delta = match self.last_time {
            Some(last) => ((now - last) as f32).clamp(0.0, self.max_step),
            None => 0.0,
        };
        self.last_time = Some(now);
        delta
    }

    /// Forget the last sample, so a resumed loop does not see the paused gap
    pub fn reset(&mut self) {
        self.last_time = None;
    }

    pub fn max_step(&self) -> f32 {
        self.max_step
    }
}
