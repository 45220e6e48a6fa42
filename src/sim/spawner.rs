//! Enemy spawning and difficulty ramp
//!
//! Two cadences run side by side: a steady trickle whose interval decays
//! geometrically toward a floor, and periodic bursts that grow with every
//! burst already triggered.

use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{Enemy, GameState};
use crate::config::{EnemyType, GameConfig, SizeVariant};
use crate::{pick_weighted, rand_between};

/// Floor on the burst cohort interval (ms)
const MIN_BURST_SPAWN_INTERVAL: f32 = 80.0;

#[derive(Debug, Clone)]
pub struct EnemySpawner {
    spawn_interval: f32,
    burst_spawn_timer: f32,
    burst_enemies_remaining: u32,
}

impl EnemySpawner {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            spawn_interval: config.enemy.spawn_interval,
            burst_spawn_timer: 0.0,
            burst_enemies_remaining: 0,
        }
    }

    pub fn reset(&mut self, config: &GameConfig) {
        *self = Self::new(config);
    }

    /// Current steady spawn interval (ms)
    pub fn spawn_interval(&self) -> f32 {
        self.spawn_interval
    }

    /// Enemies left in the running burst
    pub fn burst_enemies_remaining(&self) -> u32 {
        self.burst_enemies_remaining
    }

    pub fn update<R: Rng + ?Sized>(&mut self, state: &mut GameState, config: &GameConfig, delta: f32, rng: &mut R) {
        let ramp = config.difficulty.ramp_factor.powf(delta / config.difficulty.ramp_interval);
        self.spawn_interval = (self.spawn_interval * ramp).max(config.enemy.min_spawn_interval);

        state.spawn_timer += delta;
        if state.spawn_timer >= self.spawn_interval {
            state.spawn_timer = 0.0;
            self.spawn_enemy(state, config, rng);
        }

        state.burst_timer += delta;
        if state.burst_active_time > 0.0 {
            state.burst_active_time = (state.burst_active_time - delta).max(0.0);
        }

        if self.burst_enemies_remaining == 0 && state.burst_timer >= config.enemy.burst_interval {
            self.start_burst(state, config);
        }

        if self.burst_enemies_remaining > 0 {
            self.burst_spawn_timer += delta;
            let interval = self.burst_spawn_interval(state);
            while self.burst_spawn_timer >= interval && self.burst_enemies_remaining > 0 {
                self.burst_spawn_timer -= interval;
                self.spawn_cohort(state, config, rng);
            }
        }
    }

    /// Spawn one enemy in a random lane. Returns false when the enemy cap is hit.
    pub fn spawn_enemy<R: Rng + ?Sized>(&mut self, state: &mut GameState, config: &GameConfig, rng: &mut R) -> bool {
        if state.enemies.len() >= config.difficulty.max_enemies {
            return false;
        }

        let lane = rng.random_range(0..config.lanes);
        let ramp = 1.0 + (state.elapsed / 60_000.0) as f32;
        let speed = (config.enemy.base_speed * ramp).min(config.enemy.max_speed);
        spawn(state, config, rng, lane, 0, (speed * 0.9, speed * 1.2));
        true
    }

    /// Open a new burst
    pub fn start_burst(&mut self, state: &mut GameState, config: &GameConfig) {
        state.burst_timer = 0.0;
        state.burst_active_time = config.enemy.burst_duration;
        state.spawn_bursts_triggered += 1;
        state.difficulty_level = 1 + state.spawn_bursts_triggered;

        let growth = (state.spawn_bursts_triggered as f32 * config.enemy.burst_multiplier).ceil() as u32;
        self.burst_enemies_remaining = config.enemy.burst_spawn_count + growth;
        self.burst_spawn_timer = 0.0;

        log::info!(
            "Burst {} started: {} enemies",
            state.spawn_bursts_triggered,
            self.burst_enemies_remaining
        );
    }

    /// Accelerates as more bursts have triggered
    pub fn burst_spawn_interval(&self, state: &GameState) -> f32 {
        let baseline = (self.spawn_interval * 0.35).max(MIN_BURST_SPAWN_INTERVAL);
        let acceleration = (1.0 - state.spawn_bursts_triggered as f32 * 0.08).max(0.25);
        baseline * acceleration
    }

    /// Enemies per lane in one cohort
    pub fn cohort_size(state: &GameState) -> u32 {
        (1 + state.spawn_bursts_triggered / 2).min(3)
    }

    /// Emit one cohort over shuffled lanes, stacked vertically per lane.
    ///
    /// Each slot consumes one unit of the burst budget, including slots
    /// suppressed by the enemy cap. Returns the number actually spawned.
    pub fn spawn_cohort<R: Rng + ?Sized>(&mut self, state: &mut GameState, config: &GameConfig, rng: &mut R) -> u32 {
        let mut lanes: Vec<usize> = (0..config.lanes).collect();
        lanes.shuffle(rng);

        let per_lane = Self::cohort_size(state);
        let boost = 1.0 + state.spawn_bursts_triggered as f32 * config.difficulty.burst_ramp;
        let speed = (config.enemy.base_speed * boost).min(config.enemy.max_speed);

        let mut spawned = 0;
        for lane in lanes {
            for stack in 0..per_lane {
                if self.burst_enemies_remaining == 0 {
                    return spawned;
                }
                self.burst_enemies_remaining -= 1;
                if state.enemies.len() >= config.difficulty.max_enemies {
                    continue;
                }
                spawn(state, config, rng, lane, stack, (speed * 0.95, speed * 1.3));
                spawned += 1;
            }
        }
        spawned
    }
}

fn select_size_variant<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> SizeVariant {
    pick_weighted(&config.enemy.size_variants, |v| v.weight, rng)
        .copied()
        .unwrap_or(SizeVariant {
            scale: 1.0,
            weight: 1.0,
            can_move: false,
            move_speed: 0.0,
        })
}

fn select_enemy_type<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Option<EnemyType> {
    pick_weighted(&config.enemy.types, |t| t.weight, rng).copied()
}

/// Push a freshly rolled enemy above the top edge of `lane`
fn spawn<R: Rng + ?Sized>(
    state: &mut GameState,
    config: &GameConfig,
    rng: &mut R,
    lane: usize,
    stack: u32,
    speed_range: (f32, f32),
) {
    let variant = select_size_variant(config, rng);
    let Some(type_data) = select_enemy_type(config, rng) else {
        log::warn!("No enemy types configured, skipping spawn");
        return;
    };
    let speed = rand_between(rng, speed_range.0, speed_range.1) * type_data.speed_multiplier;
    let max_health = (variant.scale * type_data.health_multiplier).ceil().max(1.0);
    let height = config.enemy.height;
    let id = state.next_entity_id();

    state.enemies.push(Enemy {
        id,
        lane,
        y: -height * variant.scale - stack as f32 * height * 1.2,
        speed,
        size: variant.scale,
        can_move: variant.can_move,
        move_speed: variant.move_speed,
        lateral_offset: 0.0,
        lateral_direction: if rng.random_bool(0.5) { 1.0 } else { -1.0 },
        lateral_phase: rng.random::<f32>() * std::f32::consts::TAU,
        type_data,
        health: max_health,
        max_health,
        shoot_cooldown: 0.0,
    });
}
