//! Cosmetic particle physics
//!
//! Particles never affect gameplay. The pool is bounded: when full, the oldest
//! particle is evicted to make room for a new one.

use std::collections::VecDeque;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::rand_between;

/// Default particle pool capacity
pub const DEFAULT_MAX_PARTICLES: usize = 600;

/// Errors raised by malformed emission requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    #[error("particle burst requires x and y coordinates")]
    MissingOrigin,
}

/// Compositing hint for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Additive,
    Normal,
}

/// Parameters of a particle burst
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstOptions {
    /// Emission point; presets leave this unset
    #[serde(skip)]
    pub origin: Option<Vec2>,
    pub count: u32,
    pub palette: Vec<u32>,
    /// Initial speed range (units/s)
    pub speed: (f32, f32),
    /// Center direction (radians); `None` emits in all directions
    pub angle: Option<f32>,
    /// Cone width around `angle`
    pub spread: f32,
    /// Lifetime range (ms)
    pub life: (f32, f32),
    pub size: (f32, f32),
    pub gravity: f32,
    /// Per-1/60s velocity retention, clamped to [0.5, 0.99]
    pub drag: f32,
    pub blend: BlendMode,
    pub fade_power: f32,
}

impl Default for BurstOptions {
    fn default() -> Self {
        Self {
            origin: None,
            count: 12,
            palette: vec![0xffffff],
            speed: (120.0, 220.0),
            angle: None,
            spread: std::f32::consts::TAU,
            life: (240.0, 420.0),
            size: (2.0, 4.0),
            gravity: 0.0,
            drag: 0.9,
            blend: BlendMode::Additive,
            fade_power: 1.5,
        }
    }
}

impl BurstOptions {
    /// Copy of this preset anchored at `origin`
    pub fn at(&self, origin: Vec2) -> Self {
        Self {
            origin: Some(origin),
            ..self.clone()
        }
    }
}

/// A single cosmetic particle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub gravity: f32,
    pub drag: f32,
    /// Remaining life (ms)
    pub life: f32,
    pub max_life: f32,
    pub size_start: f32,
    pub size_end: f32,
    pub size: f32,
    pub color: u32,
    pub blend: BlendMode,
    pub alpha: f32,
    pub fade_power: f32,
}

/// Bounded particle pool with its own RNG stream
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    max_particles: usize,
    particles: VecDeque<Particle>,
    rng: Pcg32,
}

impl ParticleSystem {
    pub fn new(max_particles: usize, seed: u64) -> Self {
        Self {
            max_particles,
            particles: VecDeque::with_capacity(max_particles.min(DEFAULT_MAX_PARTICLES)),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Integrate and age all particles; dead ones are dropped
    pub fn update(&mut self, delta: f32) {
        if self.particles.is_empty() {
            return;
        }

        let dt = delta / 1000.0;
        self.particles.retain_mut(|p| {
            p.life -= delta;
            if p.life <= 0.0 {
                return false;
            }

            let drag = p.drag.powf(dt * 60.0);
            p.vel *= drag;
            p.vel.y += p.gravity * dt;
            p.pos += p.vel * dt;

            let life_ratio = p.life / p.max_life;
            p.alpha = life_ratio.powf(p.fade_power);
            p.size = p.size_end + (p.size_start - p.size_end) * life_ratio;
            true
        });
    }

    /// Emit a burst. Fails if the options carry no origin.
    pub fn emit_burst(&mut self, options: &BurstOptions) -> Result<usize, EffectError> {
        let origin = options.origin.ok_or(EffectError::MissingOrigin)?;
        Ok(self.emit_burst_at(options, origin))
    }

    /// Emit a burst at an explicit point, ignoring `options.origin`
    pub fn emit_burst_at(&mut self, options: &BurstOptions, origin: Vec2) -> usize {
        if self.max_particles == 0 {
            return 0;
        }

        let drag = options.drag.clamp(0.5, 0.99);
        for _ in 0..options.count {
            if self.particles.len() >= self.max_particles {
                self.particles.pop_front();
            }

            let rng = &mut self.rng;
            let theta = match options.angle {
                Some(angle) => angle - options.spread / 2.0 + rng.random::<f32>() * options.spread,
                None => rng.random::<f32>() * std::f32::consts::TAU,
            };
            let magnitude = rand_between(rng, options.speed.0, options.speed.1);
            let life = rand_between(rng, options.life.0, options.life.1);
            let size_start = rand_between(rng, options.size.0, options.size.1);
            let color = if options.palette.is_empty() {
                0xffffff
            } else {
                options.palette[rng.random_range(0..options.palette.len())]
            };

            self.particles.push_back(Particle {
                pos: origin,
                vel: Vec2::new(theta.cos(), theta.sin()) * magnitude,
                gravity: options.gravity,
                drag,
                life,
                max_life: life,
                size_start,
                size_end: size_start * 0.35,
                size: size_start,
                color,
                blend: options.blend,
                alpha: 1.0,
                fade_power: options.fade_power,
            });
        }
        options.count as usize
    }

    /// Cosmetic coin flip drawn from the particle stream
    pub fn roll(&mut self, probability: f32) -> bool {
        self.rng.random::<f32>() < probability
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARTICLES, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_without_origin_fails() {
        let mut particles = ParticleSystem::default();
        let result = particles.emit_burst(&BurstOptions::default());
        assert_eq!(result, Err(EffectError::MissingOrigin));
        assert!(particles.is_empty());
    }

    #[test]
    fn test_burst_emits_count() {
        let mut particles = ParticleSystem::default();
        let options = BurstOptions { count: 7, ..Default::default() }.at(Vec2::new(10.0, 20.0));
        assert_eq!(particles.emit_burst(&options), Ok(7));
        assert_eq!(particles.len(), 7);
        assert!(particles.particles().all(|p| p.pos == Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn test_pool_evicts_oldest() {
        let mut particles = ParticleSystem::new(10, 3);
        let first = BurstOptions {
            count: 10,
            palette: vec![0x111111],
            ..Default::default()
        };
        let second = BurstOptions {
            count: 4,
            palette: vec![0x222222],
            ..Default::default()
        };
        particles.emit_burst_at(&first, Vec2::ZERO);
        particles.emit_burst_at(&second, Vec2::ZERO);

        assert_eq!(particles.len(), 10);
        let colors: Vec<u32> = particles.particles().map(|p| p.color).collect();
        assert_eq!(colors.iter().filter(|&&c| c == 0x111111).count(), 6);
        assert_eq!(&colors[6..], &[0x222222; 4]);
    }

    #[test]
    fn test_particles_expire_and_fade() {
        let mut particles = ParticleSystem::default();
        let options = BurstOptions {
            count: 5,
            life: (100.0, 100.0),
            ..Default::default()
        };
        particles.emit_burst_at(&options, Vec2::ZERO);

        particles.update(50.0);
        assert_eq!(particles.len(), 5);
        assert!(particles.particles().all(|p| p.alpha < 1.0 && p.size < p.size_start));

        particles.update(60.0);
        assert!(particles.is_empty());
    }

    #[test]
    fn test_cone_emission_stays_in_spread() {
        let mut particles = ParticleSystem::default();
        let options = BurstOptions {
            count: 50,
            speed: (100.0, 100.0),
            angle: Some(-std::f32::consts::FRAC_PI_2),
            spread: 0.2,
            ..Default::default()
        };
        particles.emit_burst_at(&options, Vec2::ZERO);
        // Pointing up: all velocities have strongly negative y
        assert!(particles.particles().all(|p| p.vel.y < -95.0));
    }
}
