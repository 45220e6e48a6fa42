//! Game engine
//!
//! Owns the `GameState` and every subsystem, and advances them in a fixed
//! order once per frame. All collaborators except the spawner are optional:
//! without them the engine still runs bare kinematics and collisions.
//!
//! Phases:
//! - `Stopped`: `frame` is a no-op until `start`
//! - `Running`: `frame` samples the clock and steps the simulation
//! - `AwaitingUpgradeChoice`: a level-up is pending; nothing advances until
//!   `choose_upgrade` is called

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::abilities::{AbilityKind, AbilityManager};
use super::clock::FrameClock;
use super::collision;
use super::forces::{ForceField, ShakeOptions};
use super::particles::{BurstOptions, ParticleSystem};
use super::player::{self, FireReport};
use super::powerups::PowerUpManager;
use super::spawner::EnemySpawner;
use super::state::{
    Companion, DamageCause, DeathInfo, Enemy, EnemyProjectile, Flight, GameState, LeakMeta, Projectile,
};
use super::upgrades::{AppliedUpgrade, UpgradeKind, UpgradeManager, UpgradeOption};
use super::xp::XpManager;
use crate::config::{ConfigError, EffectPresets, GameConfig};
use crate::history::RunRecord;
use crate::{clamp, lane_center};

/// Chance per frame of a trail particle while moving or boosted
const TRAIL_EMIT_CHANCE: f32 = 0.3;
/// Lateral weave angular speed (rad/s)
const WEAVE_RATE: f32 = 1.5;
/// Weave smoothing factor (1/s)
const WEAVE_SMOOTHING: f32 = 3.0;
const CRIT_COLOR: u32 = 0xfbbf24;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no upgrade choice is pending")]
    NoUpgradePending,

    #[error("upgrade {0:?} was not offered")]
    UpgradeNotOffered(UpgradeKind),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Stopped,
    Running,
    AwaitingUpgradeChoice,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub state: &'a GameState,
    pub particles: Option<&'a ParticleSystem>,
    /// Camera shake offset
    pub camera: Vec2,
}

/// Callbacks into the host (renderer, HUD, persistence). All optional.
pub trait GameHost {
    /// Draw the current frame; never mutates the simulation
    fn render(&mut self, _frame: RenderFrame<'_>) {}

    /// Once per frame after update and render
    fn on_tick(&mut self, _state: &GameState) {}

    /// Exactly once per run, when the game ends
    fn on_game_over(&mut self, _state: &GameState) {}

    /// A level-up paused the run; answer with `GameEngine::choose_upgrade`
    fn on_upgrade_offer(&mut self, _options: &[UpgradeOption]) {}
}

impl GameHost for () {}

pub struct GameEngine {
    state: GameState,
    config: GameConfig,
    rng: Pcg32,
    clock: FrameClock,
    phase: EnginePhase,
    spawner: EnemySpawner,
    particles: Option<ParticleSystem>,
    forces: Option<ForceField>,
    power_ups: Option<PowerUpManager>,
    xp: Option<XpManager>,
    abilities: Option<AbilityManager>,
    upgrades: Option<UpgradeManager>,
    pending_upgrades: Vec<UpgradeOption>,
    game_over_triggered: bool,
}

impl GameEngine {
    /// Engine with every collaborator attached
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, EngineError> {
        let particles = ParticleSystem::new(config.max_particles, seed.wrapping_add(1));
        let forces = ForceField::new(seed.wrapping_add(2));
        Ok(Self::bare(config, seed)?
            .with_particles(particles)
            .with_forces(forces)
            .with_power_ups(PowerUpManager::new())
            .with_xp(XpManager::new())
            .with_abilities(AbilityManager::new())
            .with_upgrades(UpgradeManager::new()))
    }

    /// Engine with only the spawner: kinematics, collisions and scoring
    pub fn bare(config: GameConfig, seed: u64) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Engine created: {} lanes, seed {}", config.lanes, seed);
        Ok(Self {
            state: GameState::new(&config),
            rng: Pcg32::seed_from_u64(seed),
            clock: FrameClock::new(config.max_frame_ms),
            phase: EnginePhase::Stopped,
            spawner: EnemySpawner::new(&config),
            particles: None,
            forces: None,
            power_ups: None,
            xp: None,
            abilities: None,
            upgrades: None,
            pending_upgrades: Vec::new(),
            game_over_triggered: false,
            config,
        })
    }

    pub fn with_particles(mut self, particles: ParticleSystem) -> Self {
        self.particles = Some(particles);
        self
    }

    pub fn with_forces(mut self, forces: ForceField) -> Self {
        self.forces = Some(forces);
        self
    }

    pub fn with_power_ups(mut self, power_ups: PowerUpManager) -> Self {
        self.power_ups = Some(power_ups);
        self
    }

    pub fn with_xp(mut self, xp: XpManager) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn with_abilities(mut self, abilities: AbilityManager) -> Self {
        self.abilities = Some(abilities);
        self
    }

    pub fn with_upgrades(mut self, upgrades: UpgradeManager) -> Self {
        self.upgrades = Some(upgrades);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable state for hosts that script scenarios or restore snapshots
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == EnginePhase::Running
    }

    pub fn spawner(&self) -> &EnemySpawner {
        &self.spawner
    }

    pub fn particles(&self) -> Option<&ParticleSystem> {
        self.particles.as_ref()
    }

    pub fn forces(&self) -> Option<&ForceField> {
        self.forces.as_ref()
    }

    pub fn abilities(&self) -> Option<&AbilityManager> {
        self.abilities.as_ref()
    }

    /// Options of the pending level-up, empty when none is pending
    pub fn pending_upgrades(&self) -> &[UpgradeOption] {
        &self.pending_upgrades
    }

    /// Begin (or resume) sampling the frame clock. Ignored while an upgrade
    /// choice is pending.
    pub fn start(&mut self) {
        match self.phase {
            EnginePhase::Stopped => {
                self.phase = EnginePhase::Running;
                self.clock.reset();
            }
            EnginePhase::Running => {}
            EnginePhase::AwaitingUpgradeChoice => {
                log::debug!("start ignored: upgrade choice pending");
            }
        }
    }

    pub fn stop(&mut self) {
        if self.phase == EnginePhase::Running {
            self.phase = EnginePhase::Stopped;
        }
    }

    /// Run one host frame at timestamp `now` (ms): update, render, tick.
    ///
    /// Returns false without doing anything unless the engine is running.
    pub fn frame<H: GameHost + ?Sized>(&mut self, now: f64, host: &mut H) -> bool {
        if self.phase != EnginePhase::Running {
            return false;
        }
        let delta = self.clock.advance(now);
        self.update(delta, host);
        self.render(host);
        host.on_tick(&self.state);
        true
    }

    /// Hand the current frame to the renderer
    pub fn render<H: GameHost + ?Sized>(&self, host: &mut H) {
        host.render(RenderFrame {
            state: &self.state,
            particles: self.particles.as_ref(),
            camera: self.forces.as_ref().map_or(Vec2::ZERO, ForceField::offset),
        });
    }

    /// Advance the simulation by `delta` ms (capped at `max_frame_ms`)
    pub fn update<H: GameHost + ?Sized>(&mut self, delta: f32, host: &mut H) {
        if self.phase == EnginePhase::AwaitingUpgradeChoice {
            return;
        }
        let delta = clamp(delta, 0.0, self.config.max_frame_ms);

        // Ambient systems tick even after game over so effects settle
        if let Some(particles) = self.particles.as_mut() {
            particles.update(delta);
        }
        if let Some(forces) = self.forces.as_mut() {
            forces.update(delta);
        }
        if let Some(power_ups) = self.power_ups.as_ref() {
            power_ups.update(
                &mut self.state,
                &self.config,
                delta,
                self.abilities.as_mut(),
                self.particles.as_mut(),
            );
        }
        if let Some(abilities) = self.abilities.as_mut() {
            abilities.update(&mut self.state, &self.config, delta, self.particles.as_mut());
        }
        // Orbs stop counting once the run is over
        let leveled = !self.state.is_game_over
            && self
                .xp
                .as_ref()
                .is_some_and(|xp| xp.update(&mut self.state, &self.config, delta));
        if leveled {
            self.offer_upgrades(host);
        }

        if self.state.is_game_over {
            if !self.game_over_triggered {
                self.game_over_triggered = true;
                host.on_game_over(&self.state);
            }
            return;
        }

        self.state.elapsed += delta as f64;
        player::update(&mut self.state, &self.config, delta);
        if self.config.auto_fire && player::can_fire(&self.state) {
            self.fire();
        }
        self.spawner
            .update(&mut self.state, &self.config, delta, &mut self.rng);
        self.update_companions(delta);
        self.update_projectiles(delta);
        self.update_enemy_projectiles(delta);
        self.update_enemies(delta);
        self.state.update_text_popups(delta);
        self.state.refresh_dps();
        self.state
            .add_score((self.config.difficulty.score_per_second * delta / 1000.0) as f64);
        self.state.decay_combo(delta);
        self.emit_player_trail();
    }

    /// Fire a volley with muzzle flash and recoil shake
    pub fn fire(&mut self) -> Option<FireReport> {
        if self.phase == EnginePhase::AwaitingUpgradeChoice {
            return None;
        }
        let report = player::fire(&mut self.state, &self.config)?;
        let muzzle = Vec2::new(lane_center(&self.config, report.lane, 0.0), report.muzzle_y);
        let effects = &self.config.effects;
        burst(&mut self.particles, &effects.player_fire, muzzle);
        shake(&mut self.forces, effects.player_fire_shake);
        Some(report)
    }

    /// Shift the ship one or more lanes (negative is left)
    pub fn move_player(&mut self, direction: i32) {
        player::move_lane(&mut self.state, &self.config, direction);
    }

    /// Spend an ability. Returns false if unavailable.
    pub fn activate_ability(&mut self, kind: AbilityKind) -> bool {
        if self.state.is_game_over || self.phase == EnginePhase::AwaitingUpgradeChoice {
            return false;
        }
        match self.abilities.as_mut() {
            Some(abilities) => abilities.activate(kind, &mut self.state, &self.config, self.particles.as_mut()),
            None => false,
        }
    }

    /// Resolve a pending level-up and resume the run
    pub fn choose_upgrade(&mut self, kind: UpgradeKind) -> Result<AppliedUpgrade, EngineError> {
        if self.phase != EnginePhase::AwaitingUpgradeChoice {
            return Err(EngineError::NoUpgradePending);
        }
        if !self.pending_upgrades.iter().any(|o| o.kind == kind) {
            return Err(EngineError::UpgradeNotOffered(kind));
        }
        let upgrades = self.upgrades.as_ref().ok_or(EngineError::NoUpgradePending)?;
        let applied = upgrades.apply_upgrade(kind, &mut self.state, &self.config);

        self.pending_upgrades.clear();
        self.phase = EnginePhase::Running;
        self.clock.reset();
        Ok(applied)
    }

    /// Reset the run and start playing again
    pub fn restart(&mut self) {
        self.state.reset(&self.config);
        self.spawner.reset(&self.config);
        if let Some(particles) = self.particles.as_mut() {
            particles.clear();
        }
        if let Some(forces) = self.forces.as_mut() {
            forces.reset();
        }
        if let Some(abilities) = self.abilities.as_mut() {
            abilities.clear();
        }
        self.pending_upgrades.clear();
        self.game_over_triggered = false;
        self.phase = EnginePhase::Running;
        self.clock.reset();
        log::info!("Run restarted");
    }

    /// Build the persisted record of the current run
    pub fn run_record(&self, id: u64, timestamp: impl Into<String>) -> RunRecord {
        RunRecord::from_state(&self.state, id, timestamp)
    }

    fn offer_upgrades<H: GameHost + ?Sized>(&mut self, host: &mut H) {
        let Some(upgrades) = self.upgrades.as_ref() else {
            return;
        };
        let options = upgrades.get_upgrade_options(&self.state.player, &mut self.rng);
        if options.is_empty() {
            log::debug!("Level {} reached with no upgrades left to offer", self.state.player.level);
            return;
        }
        self.pending_upgrades = options;
        self.phase = EnginePhase::AwaitingUpgradeChoice;
        host.on_upgrade_offer(&self.pending_upgrades);
    }

    /// Keep the orbit in sync with the companion count, orbit, and shoot
    fn update_companions(&mut self, delta: f32) {
        let Self { state, config, rng, .. } = self;
        let tuning = &config.companions;
        let seconds = delta / 1000.0;

        let count = state.player.companion_count as usize;
        while state.companions.len() < count {
            let angle = state.companions.len() as f32 / count as f32 * std::f32::consts::TAU;
            state.companions.push(Companion {
                angle,
                cooldown: rng.random::<f32>() * tuning.spawn_cooldown_jitter,
                pos: Vec2::ZERO,
            });
        }
        state.companions.truncate(count);
        if count == 0 {
            return;
        }

        let center = Vec2::new(state.player.x(config), state.player.y);
        let power = state.player.companion_power.max(f32::EPSILON);

        for c in 0..state.companions.len() {
            let companion = &mut state.companions[c];
            companion.angle += tuning.angular_speed * seconds;
            companion.pos = center + Vec2::from_angle(companion.angle) * tuning.orbit_radius;
            companion.cooldown -= delta;
            if companion.cooldown > 0.0 {
                continue;
            }

            let from = companion.pos;
            let Some(target) = nearest_enemy_within(&state.enemies, config, from, tuning.range) else {
                continue;
            };
            let target = &state.enemies[target];
            let lane = target.lane;
            let dir = (Vec2::new(target.x(config), target.y) - from).normalize_or(Vec2::NEG_Y);

            let id = state.next_entity_id();
            state.projectiles.push(Projectile {
                id,
                lane,
                offset: 0.0,
                y: from.y,
                speed: 0.0,
                width: tuning.projectile_width,
                height: tuning.projectile_height,
                pierce: 0,
                hits: 0,
                aim: None,
                damage: None,
                flight: Flight::Vector {
                    x: from.x,
                    vel: dir * tuning.projectile_speed,
                },
            });
            state.companions[c].cooldown = tuning.base_cooldown / power;
        }
    }

    fn update_projectiles(&mut self, delta: f32) {
        let Self { state, config, .. } = self;
        let seconds = delta / 1000.0;
        let top = -config.canvas_padding;

        for i in (0..state.projectiles.len()).rev() {
            let projectile = &mut state.projectiles[i];
            let expired = match projectile.flight {
                Flight::Vector { x, vel } => {
                    projectile.flight = Flight::Vector {
                        x: x + vel.x * seconds,
                        vel,
                    };
                    projectile.y += vel.y * seconds;
                    projectile.y < top || projectile.y > config.playfield_height
                }
                Flight::Lane => {
                    apply_auto_aim(&state.enemies, config, projectile, seconds);
                    projectile.y -= projectile.speed * seconds;
                    projectile.y + projectile.height < top
                }
            };
            if expired {
                state.projectiles.remove(i);
            }
        }
    }

    fn update_enemy_projectiles(&mut self, delta: f32) {
        let Self {
            state,
            config,
            particles,
            forces,
            ..
        } = self;
        let seconds = delta / 1000.0;
        let floor = config.playfield_height + config.canvas_padding;

        for i in (0..state.enemy_projectiles.len()).rev() {
            let projectile = &mut state.enemy_projectiles[i];
            projectile.y += projectile.speed * seconds;
            if projectile.y > floor {
                state.enemy_projectiles.remove(i);
                continue;
            }

            if collision::enemy_projectile_hits_player(config, &state.enemy_projectiles[i], &state.player) {
                let info = DeathInfo {
                    cause: DamageCause::EnemyProjectile,
                    lane: state.player.lane,
                    elapsed: state.elapsed,
                    leak: None,
                };
                state.damage_player(config.damage.on_hit, info);
                let at = Vec2::new(state.player.x(config), state.player.y);
                shield_break(particles, forces, &config.effects, at);
                state.enemy_projectiles.remove(i);
            }
        }
    }

    /// Move, weave and shoot; then resolve player contact, leaks and hits.
    ///
    /// At most one projectile hit is resolved per enemy per frame.
    fn update_enemies(&mut self, delta: f32) {
        let Self {
            state,
            config,
            rng,
            particles,
            forces,
            power_ups,
            xp,
            ..
        } = self;
        let effects = &config.effects;

        for i in (0..state.enemies.len()).rev() {
            if let Some(muzzle) = advance_enemy(&mut state.enemies[i], config, delta, rng) {
                let lane = state.enemies[i].lane;
                state.enemy_projectiles.push(EnemyProjectile {
                    lane,
                    x: muzzle.x,
                    y: muzzle.y,
                    speed: config.projectile.enemy_speed,
                    width: config.projectile.enemy_width,
                    height: config.projectile.enemy_height,
                });
                burst(particles, &effects.enemy_muzzle, muzzle);
            }

            if collision::enemy_touches_player(config, &state.enemies[i], &state.player) {
                let enemy = state.enemies.remove(i);
                let info = DeathInfo {
                    cause: DamageCause::Collision,
                    lane: enemy.lane,
                    elapsed: state.elapsed,
                    leak: None,
                };
                state.damage_player(config.damage.on_hit, info);
                let at = Vec2::new(state.player.x(config), state.player.y);
                shield_break(particles, forces, effects, at);
                continue;
            }

            if collision::enemy_leaked(config, &state.enemies[i]) {
                let enemy = state.enemies.remove(i);
                let impact = Vec2::new(enemy.x(config), clamp(enemy.y, 0.0, config.playfield_height));
                burst(particles, &effects.leak, impact);
                shake(forces, effects.leak_shake);

                let info = DeathInfo {
                    cause: DamageCause::Leak,
                    lane: enemy.lane,
                    elapsed: state.elapsed,
                    leak: Some(LeakMeta {
                        enemy_speed: enemy.speed,
                        burst_active: state.burst_active_time > 0.0,
                    }),
                };
                state.damage_player(config.damage.on_leak, info);
                let floor = Vec2::new(lane_center(config, enemy.lane, 0.0), config.playfield_height);
                shield_break(particles, forces, effects, floor);
                state.enemies_passed += 1;
                continue;
            }

            let hit = (0..state.projectiles.len())
                .rev()
                .find(|&j| collision::projectile_hits_enemy(config, &state.projectiles[j], &state.enemies[i]));
            let Some(j) = hit else {
                continue;
            };

            let base = state.projectiles[j].damage.unwrap_or(state.player.damage);
            let crit = rng.random::<f32>() < config.combat.crit_chance;
            let damage = if crit { base * config.combat.crit_multiplier } else { base };

            let enemy = &mut state.enemies[i];
            let center = enemy.center(config);
            let label_at = Vec2::new(center.x, enemy.y);
            enemy.health -= damage;
            let destroyed = enemy.health <= 0.0;

            if crit {
                burst(particles, &effects.critical_hit, center);
            }
            let (color, size) = if crit {
                (CRIT_COLOR, 24.0)
            } else {
                (0xffffff, 16.0 + (damage * 2.0).min(10.0))
            };
            let label = format!("{}{}", damage.floor(), if crit { "!" } else { "" });
            state.spawn_text_popup(label, label_at.x, label_at.y, color, size);
            state.record_damage(damage);

            if destroyed {
                let enemy = state.enemies.remove(i);
                state.kills += 1;
                if state.register_combo_kill(config.combo.window, config.combo.threshold) {
                    log::info!("Combo boost active at {} kills", state.combo.count);
                }
                state.add_score((config.difficulty.score_per_enemy * enemy.score_multiplier()) as f64);
                burst(particles, &effects.enemy_destroyed, Vec2::new(center.x, center.y.max(0.0)));
                shake(forces, effects.enemy_destroyed_shake);
                if let Some(xp) = xp.as_ref() {
                    xp.spawn_xp(state, config, center);
                }
                if let Some(power_ups) = power_ups.as_ref() {
                    power_ups.maybe_drop(state, config, enemy.lane, center.y, rng);
                }
            } else {
                burst(particles, &effects.hit, center);
            }

            if collision::consume_pierce(&mut state.projectiles[j]) {
                state.projectiles.remove(j);
            }
        }
    }

    /// Sparks behind the ship while it changes lanes or is boosted
    fn emit_player_trail(&mut self) {
        let Some(particles) = self.particles.as_mut() else {
            return;
        };
        let player = &self.state.player;
        if !(player.is_moving() || self.state.combo.is_boost_active) {
            return;
        }
        if particles.roll(TRAIL_EMIT_CHANCE) {
            let at = Vec2::new(player.x(&self.config), player.y + 20.0);
            particles.emit_burst_at(&self.config.effects.player_trail, at);
        }
    }
}

/// Fall, weave and tick the shot timer. Returns a muzzle point if the enemy fires.
fn advance_enemy<R: Rng + ?Sized>(enemy: &mut Enemy, config: &GameConfig, delta: f32, rng: &mut R) -> Option<Vec2> {
    let seconds = delta / 1000.0;
    enemy.y += enemy.speed * seconds;

    if enemy.can_move && enemy.move_speed > 0.0 {
        enemy.lateral_phase += seconds * WEAVE_RATE;
        let target = enemy.lateral_phase.sin() * config.enemy.lateral_move_range * enemy.lateral_direction;
        enemy.lateral_offset += (target - enemy.lateral_offset) * seconds * WEAVE_SMOOTHING;
    }

    let shooter = enemy.type_data.shooter?;
    enemy.shoot_cooldown -= delta;
    if enemy.shoot_cooldown <= 0.0 && rng.random::<f32>() < shooter.chance {
        enemy.shoot_cooldown = shooter.cooldown;
        return Some(Vec2::new(enemy.x(config), enemy.y + enemy.height(config)));
    }
    None
}

/// Steer a lane-locked shot toward the nearest enemy ahead of it.
///
/// Offsets are in lane widths, so a cross-lane target sits at
/// `lane difference + its own lateral offset`.
fn apply_auto_aim(enemies: &[Enemy], config: &GameConfig, projectile: &mut Projectile, seconds: f32) {
    let Some(aim) = projectile.aim else {
        return;
    };

    let penalty = config.projectile.cross_lane_penalty;
    let target = enemies
        .iter()
        .filter(|e| e.y < projectile.y && (aim.cross_lane || e.lane == projectile.lane))
        .map(|e| {
            let lanes_apart = (e.lane as f32 - projectile.lane as f32).abs();
            ((e.y - projectile.y).abs() + lanes_apart * penalty, e)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, e)| e);
    let Some(target) = target else {
        return;
    };

    let target_offset = (target.lane as f32 - projectile.lane as f32) + target.lateral_offset;
    let max_adjust = (config.projectile.auto_aim_turn_rate * aim.strength * seconds).abs();
    projectile.offset += clamp(target_offset - projectile.offset, -max_adjust, max_adjust);
}

/// Index of the closest enemy to `from` within `range`, any lane
fn nearest_enemy_within(enemies: &[Enemy], config: &GameConfig, from: Vec2, range: f32) -> Option<usize> {
    enemies
        .iter()
        .enumerate()
        .map(|(i, e)| (Vec2::new(e.x(config), e.y).distance(from), i))
        .filter(|(d, _)| *d < range)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, i)| i)
}

fn burst(particles: &mut Option<ParticleSystem>, options: &BurstOptions, at: Vec2) {
    if let Some(particles) = particles.as_mut() {
        particles.emit_burst_at(options, at);
    }
}

fn shake(forces: &mut Option<ForceField>, options: ShakeOptions) {
    if let Some(forces) = forces.as_mut() {
        forces.add_shake(options);
    }
}

fn shield_break(
    particles: &mut Option<ParticleSystem>,
    forces: &mut Option<ForceField>,
    effects: &EffectPresets,
    at: Vec2,
) {
    burst(particles, &effects.shield_break, at);
    shake(forces, effects.shield_break_shake);
}
