//! Game state and entity records
//!
//! `GameState` is the single source of truth for a run. The engine owns it and
//! lends it to each subsystem for the duration of a call.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::powerups::PowerUpKind;
use super::upgrades::UpgradeKind;
use crate::config::{EnemyType, GameConfig};
use crate::{clamp, lane_center};

/// Lifetime of a floating text popup (ms)
pub const TEXT_POPUP_LIFE: f32 = 900.0;
/// Downward acceleration applied to popups (units/s²)
pub const TEXT_POPUP_GRAVITY: f32 = 200.0;
/// Rolling window for DPS accounting (ms)
pub const DPS_WINDOW_MS: f64 = 1000.0;

/// The player's ship and combat stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub lane: usize,
    pub target_lane: usize,
    /// Signed progress toward `target_lane`, in (-1, 1)
    pub lane_progress: f32,
    pub y: f32,
    pub health: u32,
    pub max_health: u32,
    pub damage: f32,
    /// Cooldown applied after each volley (ms)
    pub fire_cooldown: f32,
    /// Time until the next volley (ms); may dip below zero between shots
    pub cooldown: f32,
    pub projectile_speed: f32,
    pub bullet_count: u32,
    pub spread: f32,
    pub pierce: u32,
    pub auto_aim_strength: f32,
    pub level: u32,
    pub xp: f32,
    pub xp_to_next: f32,
    pub companion_count: u32,
    pub companion_power: f32,
    pub invulnerable: bool,
    pub invulnerable_until: f64,
    pub invulnerability_duration: f32,
    pub trail_active: bool,
    pub trail_until: f64,
    /// Upgrade levels taken this run
    pub upgrades: BTreeMap<UpgradeKind, u32>,
}

impl PlayerState {
    pub fn new(config: &GameConfig) -> Self {
        let start_lane = (config.lanes / 2).saturating_sub(1);
        Self {
            lane: start_lane,
            target_lane: start_lane,
            lane_progress: 0.0,
            y: config.player_y(),
            health: config.player.max_health,
            max_health: config.player.max_health,
            damage: config.player.base_damage,
            fire_cooldown: config.player.fire_cooldown,
            cooldown: 0.0,
            projectile_speed: config.player.projectile_speed,
            bullet_count: 1,
            spread: 0.0,
            pierce: 0,
            auto_aim_strength: config.player.auto_aim_strength,
            level: 1,
            xp: 0.0,
            xp_to_next: config.xp.base_xp_to_next,
            companion_count: 0,
            companion_power: 1.0,
            invulnerable: false,
            invulnerable_until: 0.0,
            invulnerability_duration: config.player.invulnerability_duration,
            trail_active: false,
            trail_until: 0.0,
            upgrades: BTreeMap::new(),
        }
    }

    /// World X of the ship, including an in-progress lane change
    pub fn x(&self, config: &GameConfig) -> f32 {
        lane_center(config, self.lane, self.lane_progress)
    }

    pub fn is_moving(&self) -> bool {
        self.lane != self.target_lane
    }
}

/// A descending enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub lane: usize,
    /// Top edge
    pub y: f32,
    pub speed: f32,
    /// Scale factor over the base enemy size
    pub size: f32,
    pub can_move: bool,
    pub move_speed: f32,
    /// Lateral weave in lane widths
    pub lateral_offset: f32,
    pub lateral_direction: f32,
    pub lateral_phase: f32,
    pub type_data: EnemyType,
    pub health: f32,
    pub max_health: f32,
    pub shoot_cooldown: f32,
}

impl Enemy {
    pub fn width(&self, config: &GameConfig) -> f32 {
        config.enemy.width * self.size
    }

    pub fn height(&self, config: &GameConfig) -> f32 {
        config.enemy.height * self.size
    }

    pub fn x(&self, config: &GameConfig) -> f32 {
        lane_center(config, self.lane, self.lateral_offset)
    }

    pub fn center(&self, config: &GameConfig) -> Vec2 {
        Vec2::new(self.x(config), self.y + self.height(config) / 2.0)
    }

    pub fn score_multiplier(&self) -> f32 {
        self.type_data.score_multiplier
    }
}

/// Homing descriptor carried by player shots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aim {
    pub target_lane: usize,
    pub strength: f32,
    /// May steer toward enemies in other lanes
    pub cross_lane: bool,
}

/// How a projectile travels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Flight {
    /// Locked to `lane` + `offset`, moving straight up at `speed`
    Lane,
    /// Free velocity vector (companion shots)
    Vector { x: f32, vel: Vec2 },
}

/// A friendly projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub lane: usize,
    /// Lateral offset in lane widths
    pub offset: f32,
    /// Top edge
    pub y: f32,
    pub speed: f32,
    pub width: f32,
    pub height: f32,
    /// Additional enemies this shot may pass through
    pub pierce: u32,
    pub hits: u32,
    pub aim: Option<Aim>,
    /// Overrides the player's damage when set
    pub damage: Option<f32>,
    pub flight: Flight,
}

impl Projectile {
    pub fn x(&self, config: &GameConfig) -> f32 {
        match self.flight {
            Flight::Lane => lane_center(config, self.lane, self.offset),
            Flight::Vector { x, .. } => x,
        }
    }

    pub fn is_companion(&self) -> bool {
        matches!(self.flight, Flight::Vector { .. })
    }
}

/// A hostile projectile falling toward the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyProjectile {
    pub lane: usize,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub width: f32,
    pub height: f32,
}

/// An orbiting ally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Companion {
    pub angle: f32,
    pub cooldown: f32,
    pub pos: Vec2,
}

/// A falling experience orb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpOrb {
    pub pos: Vec2,
    pub vy: f32,
    pub size: f32,
    pub value: f32,
}

/// A falling collectible power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub vy: f32,
}

/// Floating feedback text (damage numbers, pickups)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPopup {
    pub text: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: u32,
    pub size: f32,
    pub life: f32,
    pub max_life: f32,
    pub alpha: f32,
}

/// Kill streak
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Combo {
    pub count: u32,
    /// Remaining time before the streak breaks (ms)
    pub timer: f32,
    pub max_combo: u32,
    pub is_boost_active: bool,
}

/// Damage dealt at a point in time, for DPS
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DamageSample {
    pub time: f64,
    pub amount: f32,
}

/// Why the player took damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DamageCause {
    Collision,
    Leak,
    EnemyProjectile,
}

impl DamageCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageCause::Collision => "collision",
            DamageCause::Leak => "leak",
            DamageCause::EnemyProjectile => "enemy-projectile",
        }
    }
}

/// Extra context recorded when an enemy leaks past the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakMeta {
    pub enemy_speed: f32,
    pub burst_active: bool,
}

/// Circumstances of a damage event; kept as `death_info` when it is fatal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathInfo {
    pub cause: DamageCause,
    pub lane: usize,
    pub elapsed: f64,
    pub leak: Option<LeakMeta>,
}

/// Complete world snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub player: PlayerState,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub enemy_projectiles: Vec<EnemyProjectile>,
    pub companions: Vec<Companion>,
    pub xp_orbs: Vec<XpOrb>,
    pub power_ups: Vec<PowerUp>,
    pub text_popups: Vec<TextPopup>,
    pub combo: Combo,
    pub score: f64,
    /// Simulated time (ms)
    pub elapsed: f64,
    pub kills: u32,
    pub enemies_passed: u32,
    pub dps: f32,
    pub damage_dealt: Vec<DamageSample>,
    pub spawn_timer: f32,
    pub burst_timer: f32,
    pub burst_active_time: f32,
    pub spawn_bursts_triggered: u32,
    pub difficulty_level: u32,
    pub is_game_over: bool,
    pub death_info: Option<DeathInfo>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            player: PlayerState::new(config),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            enemy_projectiles: Vec::new(),
            companions: Vec::new(),
            xp_orbs: Vec::new(),
            power_ups: Vec::new(),
            text_popups: Vec::new(),
            combo: Combo::default(),
            score: 0.0,
            elapsed: 0.0,
            kills: 0,
            enemies_passed: 0,
            dps: 0.0,
            damage_dealt: Vec::new(),
            spawn_timer: 0.0,
            burst_timer: 0.0,
            burst_active_time: 0.0,
            spawn_bursts_triggered: 0,
            difficulty_level: 1,
            is_game_over: false,
            death_info: None,
            next_id: 1,
        }
    }

    /// Reinitialize every field to its starting value
    pub fn reset(&mut self, config: &GameConfig) {
        *self = Self::new(config);
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Add (or subtract) score, never dropping below zero
    pub fn add_score(&mut self, amount: f64) {
        self.score = (self.score + amount).max(0.0);
    }

    pub fn is_invulnerable(&self) -> bool {
        self.player.invulnerable && self.elapsed <= self.player.invulnerable_until
    }

    /// Damage the player. Returns true when health actually dropped.
    ///
    /// Ignored after game over and during the invulnerability window. A fatal
    /// hit records `info` as the death cause and ends the run.
    pub fn damage_player(&mut self, amount: u32, info: DeathInfo) -> bool {
        if self.is_game_over || amount == 0 || self.is_invulnerable() {
            return false;
        }

        let player = &mut self.player;
        player.health = player.health.saturating_sub(amount).min(player.max_health);
        player.invulnerable = true;
        player.invulnerable_until = self.elapsed + player.invulnerability_duration as f64;

        if player.health == 0 {
            self.is_game_over = true;
            self.death_info = Some(info);
            log::info!(
                "Game over: {} in lane {} after {:.1}s, score {}",
                info.cause.as_str(),
                info.lane,
                self.elapsed / 1000.0,
                self.score.floor()
            );
        }
        true
    }

    /// Restore health, capped at max
    pub fn heal_player(&mut self, amount: u32) {
        if self.is_game_over {
            return;
        }
        let player = &mut self.player;
        player.health = player.health.saturating_add(amount).min(player.max_health);
    }

    /// Queue a floating text popup
    pub fn spawn_text_popup(&mut self, text: impl Into<String>, x: f32, y: f32, color: u32, size: f32) {
        self.text_popups.push(TextPopup {
            text: text.into(),
            pos: Vec2::new(x, y),
            vel: Vec2::new(0.0, -120.0),
            color,
            size,
            life: 0.0,
            max_life: TEXT_POPUP_LIFE,
            alpha: 1.0,
        });
    }

    /// Advance popups; expired ones are dropped
    pub fn update_text_popups(&mut self, delta: f32) {
        let seconds = delta / 1000.0;
        self.text_popups.retain_mut(|popup| {
            popup.life += delta;
            popup.pos += popup.vel * seconds;
            popup.vel.y += TEXT_POPUP_GRAVITY * seconds;
            popup.alpha = clamp(1.0 - popup.life / popup.max_life, 0.0, 1.0);
            popup.life < popup.max_life
        });
    }

    /// Log damage dealt to enemies for DPS
    pub fn record_damage(&mut self, amount: f32) {
        self.damage_dealt.push(DamageSample {
            time: self.elapsed,
            amount,
        });
    }

    /// Drop samples older than the DPS window and recompute DPS
    pub fn refresh_dps(&mut self) {
        let cutoff = self.elapsed - DPS_WINDOW_MS;
        self.damage_dealt.retain(|d| d.time > cutoff);
        self.dps = self.damage_dealt.iter().map(|d| d.amount).sum();
    }

    /// Register a kill on the streak counter. Returns true if this kill started the boost.
    pub fn register_combo_kill(&mut self, window: f32, threshold: u32) -> bool {
        let combo = &mut self.combo;
        combo.count += 1;
        combo.timer = window;
        combo.max_combo = combo.max_combo.max(combo.count);
        if combo.count >= threshold && !combo.is_boost_active {
            combo.is_boost_active = true;
            return true;
        }
        false
    }

    /// Run down the streak timer
    pub fn decay_combo(&mut self, delta: f32) {
        if self.combo.count == 0 {
            return;
        }
        self.combo.timer -= delta;
        if self.combo.timer <= 0.0 {
            self.combo.count = 0;
            self.combo.is_boost_active = false;
        }
    }

    /// Total upgrade levels taken
    pub fn upgrade_count(&self) -> u32 {
        self.player.upgrades.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hit(state: &GameState, cause: DamageCause) -> DeathInfo {
        DeathInfo {
            cause,
            lane: state.player.lane,
            elapsed: state.elapsed,
            leak: None,
        }
    }

    #[test]
    fn test_new_state_defaults() {
        let config = GameConfig::default();
        let state = GameState::new(&config);
        assert_eq!(state.player.health, 5);
        assert_eq!(state.player.lane, 1);
        assert_eq!(state.player.target_lane, 1);
        assert_eq!(state.player.level, 1);
        assert!(!state.is_game_over);
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_invulnerability_window() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);

        assert!(state.damage_player(1, hit(&state, DamageCause::Collision)));
        assert_eq!(state.player.health, 4);
        assert!(state.player.invulnerable);

        // Still inside the window
        state.elapsed = 1999.0;
        assert!(!state.damage_player(1, hit(&state, DamageCause::Collision)));
        state.elapsed = 2000.0;
        assert!(!state.damage_player(1, hit(&state, DamageCause::Collision)));
        assert_eq!(state.player.health, 4);

        state.elapsed = 2000.5;
        assert!(state.damage_player(1, hit(&state, DamageCause::Collision)));
        assert_eq!(state.player.health, 3);
    }

    #[test]
    fn test_fatal_damage_sets_game_over_once() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let info = DeathInfo {
            cause: DamageCause::Leak,
            lane: 3,
            elapsed: 0.0,
            leak: Some(LeakMeta { enemy_speed: 200.0, burst_active: false }),
        };

        assert!(state.damage_player(10, info));
        assert_eq!(state.player.health, 0);
        assert!(state.is_game_over);
        assert_eq!(state.death_info.map(|d| d.cause), Some(DamageCause::Leak));

        // Frozen after game over
        state.elapsed = 1.0e9;
        let later = hit(&state, DamageCause::Collision);
        assert!(!state.damage_player(1, later));
        assert_eq!(state.death_info.map(|d| d.lane), Some(3));
    }

    #[test]
    fn test_reset_after_game_over() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.score = 1234.0;
        state.xp_orbs.push(XpOrb { pos: Vec2::ZERO, vy: 0.0, size: 8.0, value: 1.0 });
        state.spawn_text_popup("hi", 0.0, 0.0, 0xffffff, 16.0);
        state.damage_player(99, hit(&state, DamageCause::Collision));
        assert!(state.is_game_over);

        state.reset(&config);
        assert_eq!(state.player.health, state.player.max_health);
        assert_eq!(state.score, 0.0);
        assert!(state.xp_orbs.is_empty());
        assert!(state.text_popups.is_empty());
        assert!(state.enemies.is_empty() && state.projectiles.is_empty());
        assert!(!state.is_game_over);
        assert!(state.death_info.is_none());
    }

    #[test]
    fn test_dps_window_purges_old_samples() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.record_damage(3.0);
        state.elapsed = 500.0;
        state.record_damage(2.0);
        state.refresh_dps();
        assert_eq!(state.dps, 5.0);

        state.elapsed = 1200.0;
        state.refresh_dps();
        assert_eq!(state.dps, 2.0);
        assert_eq!(state.damage_dealt.len(), 1);
    }

    #[test]
    fn test_combo_boost_and_decay() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        for i in 0..10 {
            let started = state.register_combo_kill(2000.0, 10);
            assert_eq!(started, i == 9);
        }
        assert!(state.combo.is_boost_active);
        state.decay_combo(1999.0);
        assert_eq!(state.combo.count, 10);
        state.decay_combo(2.0);
        assert_eq!(state.combo.count, 0);
        assert!(!state.combo.is_boost_active);
        assert_eq!(state.combo.max_combo, 10);
    }

    #[test]
    fn test_text_popups_expire() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.spawn_text_popup("12", 100.0, 100.0, 0xffffff, 18.0);
        state.update_text_popups(450.0);
        assert_eq!(state.text_popups.len(), 1);
        assert!((state.text_popups[0].alpha - 0.5).abs() < 1e-4);
        state.update_text_popups(450.0);
        assert!(state.text_popups.is_empty());
    }

    #[derive(Debug, Clone)]
    enum HealthOp {
        Damage(u32),
        Heal(u32),
        Wait(f64),
    }

    fn health_op() -> impl Strategy<Value = HealthOp> {
        prop_oneof![
            (0u32..4).prop_map(HealthOp::Damage),
            (0u32..4).prop_map(HealthOp::Heal),
            (0.0f64..3000.0).prop_map(HealthOp::Wait),
        ]
    }

    proptest! {
        #[test]
        fn prop_health_stays_bounded(ops in proptest::collection::vec(health_op(), 0..64)) {
            let config = GameConfig::default();
            let mut state = GameState::new(&config);
            let mut game_over_transitions = 0;

            for op in ops {
                let was_over = state.is_game_over;
                match op {
                    HealthOp::Damage(amount) => {
                        let info = hit(&state, DamageCause::Collision);
                        state.damage_player(amount, info);
                    }
                    HealthOp::Heal(amount) => state.heal_player(amount),
                    HealthOp::Wait(ms) => state.elapsed += ms,
                }
                if !was_over && state.is_game_over {
                    game_over_transitions += 1;
                }
                prop_assert!(state.player.health <= state.player.max_health);
                prop_assert_eq!(state.is_game_over, state.player.health == 0);
            }
            prop_assert!(game_over_transitions <= 1);
        }
    }
}
