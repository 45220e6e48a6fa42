//! Game tunables
//!
//! Static balance data injected into the engine at construction. Every section
//! is `#[serde(default)]` so a JSON file only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::forces::ShakeOptions;
use crate::sim::particles::{BlendMode, BurstOptions};
use crate::sim::powerups::{PowerUpDef, default_power_ups};

/// Errors raised while loading or validating tunables
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tunable `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnemyKind {
    Basic,
    Tank,
    Shooter,
    Fast,
}

impl EnemyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Basic => "Basic",
            EnemyKind::Tank => "Tank",
            EnemyKind::Shooter => "Shooter",
            EnemyKind::Fast => "Fast",
        }
    }
}

/// Shooting capability of an enemy type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShooterSpec {
    /// Milliseconds between shot attempts
    pub cooldown: f32,
    /// Probability a ready enemy actually fires on a given frame
    pub chance: f32,
}

/// Behavior descriptor shared by every enemy of one type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyType {
    pub kind: EnemyKind,
    pub color: u32,
    pub weight: f32,
    pub health_multiplier: f32,
    pub score_multiplier: f32,
    #[serde(default = "one")]
    pub speed_multiplier: f32,
    #[serde(default)]
    pub shooter: Option<ShooterSpec>,
}

impl EnemyType {
    pub fn can_shoot(&self) -> bool {
        self.shooter.is_some()
    }
}

/// Enemy body size variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeVariant {
    pub scale: f32,
    pub weight: f32,
    /// Whether the enemy weaves laterally inside its lane
    pub can_move: bool,
    pub move_speed: f32,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub width: f32,
    pub height: f32,
    /// Milliseconds to cross one lane
    pub move_duration: f32,
    pub fire_cooldown: f32,
    pub min_fire_cooldown: f32,
    pub invulnerability_duration: f32,
    pub max_health: u32,
    pub projectile_speed: f32,
    pub projectile_speed_max: f32,
    pub spread_step: f32,
    pub max_spread: f32,
    pub auto_aim_strength: f32,
    pub base_damage: f32,
    pub max_bullets: u32,
    pub max_pierce: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 48.0,
            move_duration: 150.0,
            fire_cooldown: 220.0,
            min_fire_cooldown: 90.0,
            invulnerability_duration: 2000.0,
            max_health: 5,
            projectile_speed: 760.0,
            projectile_speed_max: 1080.0,
            spread_step: 0.12,
            max_spread: 0.32,
            auto_aim_strength: 1.6,
            base_damage: 1.0,
            max_bullets: 5,
            max_pierce: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub width: f32,
    pub height: f32,
    /// Lateral steering rate in lane widths per second at aim strength 1
    pub auto_aim_turn_rate: f32,
    /// Aim strength from which shots may retarget into other lanes
    pub cross_lane_aim_threshold: f32,
    /// Distance penalty per lane of separation when picking a cross-lane target
    pub cross_lane_penalty: f32,
    pub enemy_speed: f32,
    pub enemy_width: f32,
    pub enemy_height: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 24.0,
            auto_aim_turn_rate: 5.4,
            cross_lane_aim_threshold: 2.4,
            cross_lane_penalty: 240.0,
            enemy_speed: 400.0,
            enemy_width: 6.0,
            enemy_height: 18.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub width: f32,
    pub height: f32,
    pub base_speed: f32,
    pub max_speed: f32,
    pub spawn_interval: f32,
    pub min_spawn_interval: f32,
    pub burst_spawn_count: u32,
    pub burst_multiplier: f32,
    pub burst_interval: f32,
    pub burst_duration: f32,
    /// Max lateral weave as a fraction of lane width
    pub lateral_move_range: f32,
    pub size_variants: Vec<SizeVariant>,
    pub types: Vec<EnemyType>,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            width: 28.0,
            height: 38.0,
            base_speed: 180.0,
            max_speed: 540.0,
            spawn_interval: 950.0,
            min_spawn_interval: 320.0,
            burst_spawn_count: 6,
            burst_multiplier: 2.1,
            burst_interval: 12000.0,
            burst_duration: 2200.0,
            lateral_move_range: 0.35,
            size_variants: vec![
                SizeVariant { scale: 0.6, weight: 0.3, can_move: true, move_speed: 45.0 },
                SizeVariant { scale: 0.8, weight: 0.25, can_move: true, move_speed: 30.0 },
                SizeVariant { scale: 1.0, weight: 0.25, can_move: false, move_speed: 0.0 },
                SizeVariant { scale: 1.3, weight: 0.15, can_move: false, move_speed: 0.0 },
                SizeVariant { scale: 1.6, weight: 0.05, can_move: false, move_speed: 0.0 },
            ],
            types: vec![
                EnemyType {
                    kind: EnemyKind::Basic,
                    color: 0xff4f6d,
                    weight: 0.5,
                    health_multiplier: 1.0,
                    score_multiplier: 1.0,
                    speed_multiplier: 1.0,
                    shooter: None,
                },
                EnemyType {
                    kind: EnemyKind::Tank,
                    color: 0xff8c42,
                    weight: 0.2,
                    health_multiplier: 3.0,
                    score_multiplier: 3.0,
                    speed_multiplier: 1.0,
                    shooter: None,
                },
                EnemyType {
                    kind: EnemyKind::Shooter,
                    color: 0x8b5cf6,
                    weight: 0.15,
                    health_multiplier: 1.5,
                    score_multiplier: 2.0,
                    speed_multiplier: 1.0,
                    shooter: Some(ShooterSpec { cooldown: 2000.0, chance: 0.3 }),
                },
                EnemyType {
                    kind: EnemyKind::Fast,
                    color: 0x22d3ee,
                    weight: 0.15,
                    health_multiplier: 0.7,
                    score_multiplier: 1.5,
                    speed_multiplier: 1.4,
                    shooter: None,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub ramp_interval: f32,
    pub ramp_factor: f32,
    pub score_per_second: f32,
    pub score_per_enemy: f32,
    pub burst_ramp: f32,
    pub max_enemies: usize,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            ramp_interval: 10000.0,
            ramp_factor: 0.92,
            score_per_second: 5.0,
            score_per_enemy: 25.0,
            burst_ramp: 0.1,
            max_enemies: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    pub on_hit: u32,
    pub on_leak: u32,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self { on_hit: 1, on_leak: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    /// Milliseconds a streak survives without a kill
    pub window: f32,
    /// Kills needed for the fire-rate boost
    pub threshold: u32,
    /// Cooldown multiplier while boosted (lower is faster)
    pub fire_rate_boost: f32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            window: 2000.0,
            threshold: 10,
            fire_rate_boost: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub crit_chance: f32,
    pub crit_multiplier: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            crit_chance: 0.1,
            crit_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    pub drop_chance: f32,
    /// Added drop chance per triggered burst
    pub drop_ramp: f32,
    pub max_drop_chance: f32,
    pub max_active: usize,
    pub gravity: f32,
    pub magnet_radius: f32,
    pub collect_radius: f32,
    /// Pull speed at zero distance, fading linearly to 0 at the magnet radius
    pub magnet_pull: f32,
    pub launch_speed: f32,
    pub launch_jitter: f32,
    pub definitions: Vec<PowerUpDef>,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            drop_chance: 0.08,
            drop_ramp: 0.015,
            max_drop_chance: 0.45,
            max_active: 8,
            gravity: 280.0,
            magnet_radius: 180.0,
            collect_radius: 44.0,
            magnet_pull: 520.0,
            launch_speed: 120.0,
            launch_jitter: 40.0,
            definitions: default_power_ups(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XpConfig {
    pub gravity: f32,
    pub magnet_radius: f32,
    pub collect_radius: f32,
    pub pull_speed: f32,
    pub orb_size: f32,
    /// Discard orbs this far below the playfield
    pub offscreen_margin: f32,
    pub base_xp_to_next: f32,
    pub level_growth: f32,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            gravity: 540.0,
            magnet_radius: 150.0,
            collect_radius: 40.0,
            pull_speed: 480.0,
            orb_size: 8.0,
            offscreen_margin: 50.0,
            base_xp_to_next: 5.0,
            level_growth: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub orbit_radius: f32,
    /// Radians per second
    pub angular_speed: f32,
    pub range: f32,
    pub projectile_speed: f32,
    pub projectile_width: f32,
    pub projectile_height: f32,
    /// Shot cooldown at companion power 1
    pub base_cooldown: f32,
    pub spawn_cooldown_jitter: f32,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            orbit_radius: 60.0,
            angular_speed: 1.2,
            range: 400.0,
            projectile_speed: 600.0,
            projectile_width: 6.0,
            projectile_height: 16.0,
            base_cooldown: 400.0,
            spawn_cooldown_jitter: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub trail_damage_per_second: f32,
    /// Vertical half-band around the player inside which the trail bites
    pub trail_band: f32,
    pub side_blast_reward: f32,
    pub trail_reward: f32,
    pub orb_launch_speed: f32,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            trail_damage_per_second: 30.0,
            trail_band: 60.0,
            side_blast_reward: 0.5,
            trail_reward: 0.3,
            orb_launch_speed: 100.0,
        }
    }
}

/// Particle and shake presets for every feedback event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectPresets {
    pub player_fire: BurstOptions,
    pub player_fire_shake: ShakeOptions,
    pub enemy_destroyed: BurstOptions,
    pub enemy_destroyed_shake: ShakeOptions,
    pub leak: BurstOptions,
    pub leak_shake: ShakeOptions,
    pub critical_hit: BurstOptions,
    pub shield_break: BurstOptions,
    pub shield_break_shake: ShakeOptions,
    pub player_trail: BurstOptions,
    pub hit: BurstOptions,
    pub enemy_muzzle: BurstOptions,
    pub power_up_collect: BurstOptions,
    pub lane_clear: BurstOptions,
    pub side_blast: BurstOptions,
    pub trail_damage: BurstOptions,
}

impl Default for EffectPresets {
    fn default() -> Self {
        Self {
            player_fire: BurstOptions {
                count: 8,
                palette: vec![0xffe566, 0xfff6a8, 0xffb347],
                speed: (160.0, 240.0),
                angle: Some(-std::f32::consts::FRAC_PI_2),
                spread: std::f32::consts::PI / 6.0,
                life: (140.0, 220.0),
                size: (1.5, 3.5),
                gravity: 200.0,
                drag: 0.82,
                fade_power: 1.2,
                ..Default::default()
            },
            player_fire_shake: ShakeOptions { magnitude: 3.0, duration: 90.0 },
            enemy_destroyed: BurstOptions {
                count: 14,
                palette: vec![0xff4f6d, 0xffd1dc, 0xff7b93],
                speed: (150.0, 260.0),
                life: (220.0, 360.0),
                size: (2.2, 4.8),
                gravity: 300.0,
                drag: 0.88,
                fade_power: 1.4,
                ..Default::default()
            },
            enemy_destroyed_shake: ShakeOptions { magnitude: 6.0, duration: 180.0 },
            leak: BurstOptions {
                count: 18,
                palette: vec![0xf060d0, 0xff96e6, 0xffffff],
                speed: (120.0, 240.0),
                life: (240.0, 420.0),
                size: (2.5, 5.5),
                gravity: 360.0,
                drag: 0.86,
                fade_power: 1.6,
                ..Default::default()
            },
            leak_shake: ShakeOptions { magnitude: 8.0, duration: 240.0 },
            critical_hit: BurstOptions {
                count: 12,
                palette: vec![0xfbbf24, 0xf59e0b, 0xffffff],
                speed: (180.0, 300.0),
                life: (200.0, 400.0),
                size: (2.0, 4.0),
                gravity: 200.0,
                drag: 0.85,
                ..Default::default()
            },
            shield_break: BurstOptions {
                count: 20,
                palette: vec![0xbae6fd, 0xe0f2fe, 0xffffff],
                speed: (150.0, 350.0),
                life: (400.0, 600.0),
                size: (3.0, 6.0),
                gravity: 400.0,
                drag: 0.9,
                blend: BlendMode::Normal,
                ..Default::default()
            },
            shield_break_shake: ShakeOptions { magnitude: 12.0, duration: 300.0 },
            player_trail: BurstOptions {
                count: 1,
                palette: vec![0xffffff, 0x38bdf8],
                speed: (0.0, 20.0),
                life: (150.0, 250.0),
                size: (2.0, 3.0),
                gravity: 0.0,
                drag: 0.9,
                fade_power: 2.0,
                ..Default::default()
            },
            hit: BurstOptions {
                count: 8,
                palette: vec![0xffffff, 0xffff00],
                speed: (80.0, 140.0),
                life: (100.0, 180.0),
                size: (1.5, 3.0),
                gravity: 100.0,
                drag: 0.85,
                ..Default::default()
            },
            enemy_muzzle: BurstOptions {
                count: 4,
                palette: vec![0x8b5cf6, 0xa78bfa],
                speed: (60.0, 120.0),
                life: (80.0, 140.0),
                size: (1.0, 2.5),
                gravity: -50.0,
                drag: 0.9,
                ..Default::default()
            },
            power_up_collect: BurstOptions {
                count: 32,
                palette: vec![0xffffff],
                speed: (240.0, 360.0),
                life: (280.0, 420.0),
                size: (2.5, 5.0),
                gravity: -160.0,
                drag: 0.88,
                ..Default::default()
            },
            lane_clear: BurstOptions {
                count: 20,
                palette: vec![0xfbbf24, 0xf59e0b, 0xffffff],
                speed: (200.0, 400.0),
                life: (400.0, 600.0),
                size: (4.0, 8.0),
                gravity: 0.0,
                drag: 0.92,
                ..Default::default()
            },
            side_blast: BurstOptions {
                count: 40,
                palette: vec![0x8b5cf6, 0xa78bfa, 0xffffff],
                speed: (300.0, 500.0),
                life: (300.0, 500.0),
                size: (3.0, 6.0),
                gravity: -200.0,
                drag: 0.88,
                ..Default::default()
            },
            trail_damage: BurstOptions {
                count: 5,
                palette: vec![0xf97316, 0xfb923c],
                speed: (80.0, 150.0),
                life: (200.0, 300.0),
                size: (2.0, 4.0),
                gravity: 0.0,
                drag: 0.9,
                ..Default::default()
            },
        }
    }
}

/// Complete set of tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub lanes: usize,
    pub lane_width: f32,
    pub canvas_padding: f32,
    pub playfield_height: f32,
    /// Hard cap on a single simulation step (ms)
    pub max_frame_ms: f32,
    /// Fire automatically whenever the weapon is ready
    pub auto_fire: bool,
    pub max_particles: usize,
    pub player: PlayerConfig,
    pub projectile: ProjectileConfig,
    pub enemy: EnemyConfig,
    pub difficulty: DifficultyConfig,
    pub damage: DamageConfig,
    pub combo: ComboConfig,
    pub combat: CombatConfig,
    pub power_ups: PowerUpConfig,
    pub xp: XpConfig,
    pub companions: CompanionConfig,
    pub abilities: AbilityConfig,
    pub effects: EffectPresets,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            lanes: 4,
            lane_width: 120.0,
            canvas_padding: 16.0,
            playfield_height: 1000.0,
            max_frame_ms: 32.0,
            auto_fire: false,
            max_particles: 600,
            player: PlayerConfig::default(),
            projectile: ProjectileConfig::default(),
            enemy: EnemyConfig::default(),
            difficulty: DifficultyConfig::default(),
            damage: DamageConfig::default(),
            combo: ComboConfig::default(),
            combat: CombatConfig::default(),
            power_ups: PowerUpConfig::default(),
            xp: XpConfig::default(),
            companions: CompanionConfig::default(),
            abilities: AbilityConfig::default(),
            effects: EffectPresets::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load tunables from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resting Y of the player ship (center)
    pub fn player_y(&self) -> f32 {
        self.playfield_height - self.canvas_padding - self.player.height
    }

    /// Reject tunables the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, reason })
        }

        if self.lanes == 0 {
            return invalid("lanes", "must be at least 1");
        }
        if !(self.lane_width > 0.0) {
            return invalid("lane_width", "must be positive");
        }
        if !(self.playfield_height > 0.0) {
            return invalid("playfield_height", "must be positive");
        }
        if !(self.max_frame_ms > 0.0) {
            return invalid("max_frame_ms", "must be positive");
        }
        if !(self.player.move_duration > 0.0) {
            return invalid("player.move_duration", "must be positive");
        }
        if self.player.max_health == 0 {
            return invalid("player.max_health", "must be at least 1");
        }
        if !(self.enemy.min_spawn_interval > 0.0) {
            return invalid("enemy.min_spawn_interval", "must be positive");
        }
        if !(self.difficulty.ramp_interval > 0.0) {
            return invalid("difficulty.ramp_interval", "must be positive");
        }
        if !(self.difficulty.ramp_factor > 0.0 && self.difficulty.ramp_factor <= 1.0) {
            return invalid("difficulty.ramp_factor", "must be in (0, 1]");
        }
        if self.enemy.size_variants.is_empty() {
            return invalid("enemy.size_variants", "must not be empty");
        }
        if self.enemy.types.is_empty() {
            return invalid("enemy.types", "must not be empty");
        }
        let weights_ok = self
            .enemy
            .size_variants
            .iter()
            .map(|v| v.weight)
            .chain(self.enemy.types.iter().map(|t| t.weight))
            .all(|w| w.is_finite() && w >= 0.0);
        if !weights_ok {
            return invalid("enemy weights", "must be finite and non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lanes, 4);
        assert_eq!(config.player_y(), 1000.0 - 16.0 - 48.0);
        assert_eq!(config.power_ups.definitions.len(), 8);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = GameConfig::from_json(r#"{ "lanes": 6, "enemy": { "base_speed": 200.0 } }"#)
            .expect("valid config");
        assert_eq!(config.lanes, 6);
        assert_eq!(config.enemy.base_speed, 200.0);
        // Untouched fields keep defaults
        assert_eq!(config.enemy.max_speed, 540.0);
        assert_eq!(config.enemy.types.len(), 4);
    }

    #[test]
    fn test_rejects_zero_lanes() {
        let err = GameConfig::from_json(r#"{ "lanes": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "lanes", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = GameConfig::from_json("{ lanes: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = GameConfig::default();
        config.enemy.types[0].weight = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let json = serde_json::to_string(&GameConfig::default()).expect("serialize");
        let config = GameConfig::from_json(&json).expect("parse");
        assert_eq!(config.effects.player_fire.count, 8);
    }
}
