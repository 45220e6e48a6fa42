//! Power-up drops
//!
//! Killed enemies may drop a collectible that falls, gets magnetized toward
//! the ship and applies a one-shot effect on pickup.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::abilities::{AbilityKind, AbilityManager};
use super::particles::ParticleSystem;
use super::state::{GameState, PowerUp};
use crate::config::GameConfig;
use crate::{clamp, lane_center, rand_between};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerUpKind {
    RapidFire,
    Multishot,
    Pierce,
    Velocity,
    Repair,
    LaneNuke,
    TrailBlazer,
    SideBlast,
}

/// Ability granted by an activatable power-up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AbilityGrant {
    Charges { ability: AbilityKind, charges: u32 },
    Timed { ability: AbilityKind, duration: f32 },
}

/// What a power-up does on pickup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerUpEffect {
    FireCooldownMultiplier(f32),
    BulletCountIncrease(u32),
    PierceIncrease(u32),
    ProjectileSpeedBonus(f32),
    Heal(u32),
    Ability(AbilityGrant),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpDef {
    pub kind: PowerUpKind,
    pub title: String,
    pub description: String,
    pub color: u32,
    pub effect: PowerUpEffect,
}

fn def(kind: PowerUpKind, title: &str, description: &str, color: u32, effect: PowerUpEffect) -> PowerUpDef {
    PowerUpDef {
        kind,
        title: title.to_string(),
        description: description.to_string(),
        color,
        effect,
    }
}

/// The stock drop table
pub fn default_power_ups() -> Vec<PowerUpDef> {
    use PowerUpEffect::*;
    vec![
        def(
            PowerUpKind::RapidFire,
            "Rapid Fire",
            "Fire rate greatly increased.",
            0xffe066,
            FireCooldownMultiplier(0.82),
        ),
        def(
            PowerUpKind::Multishot,
            "Multi-Shot",
            "Adds another projectile per volley.",
            0x7dd3ff,
            BulletCountIncrease(1),
        ),
        def(
            PowerUpKind::Pierce,
            "Pierce Rounds",
            "Shots pierce through one extra enemy.",
            0xf472b6,
            PierceIncrease(1),
        ),
        def(
            PowerUpKind::Velocity,
            "Velocity Boost",
            "Projectiles travel much faster.",
            0x60a5fa,
            ProjectileSpeedBonus(140.0),
        ),
        def(PowerUpKind::Repair, "Repair Kit", "Restore one point of health.", 0xf87171, Heal(1)),
        def(
            PowerUpKind::LaneNuke,
            "Lane Clearer",
            "Clear all enemies in your current lane.",
            0xfbbf24,
            Ability(AbilityGrant::Charges { ability: AbilityKind::LaneClear, charges: 1 }),
        ),
        def(
            PowerUpKind::TrailBlazer,
            "Trail Blazer",
            "Leave a damaging trail when moving between lanes.",
            0xf97316,
            Ability(AbilityGrant::Timed { ability: AbilityKind::DamageTrail, duration: 8000.0 }),
        ),
        def(
            PowerUpKind::SideBlast,
            "Side Blast",
            "Blast the adjacent lanes.",
            0x8b5cf6,
            Ability(AbilityGrant::Charges { ability: AbilityKind::SideBlast, charges: 2 }),
        ),
    ]
}

/// Drop, physics and pickup of power-ups
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerUpManager;

impl PowerUpManager {
    pub fn new() -> Self {
        Self
    }

    /// Current drop probability
    pub fn drop_chance(state: &GameState, config: &GameConfig) -> f32 {
        let tuning = &config.power_ups;
        let bonus = state.spawn_bursts_triggered as f32 * tuning.drop_ramp;
        (tuning.drop_chance + bonus).min(tuning.max_drop_chance)
    }

    /// Roll for a drop where an enemy died. Returns the spawned kind, if any.
    pub fn maybe_drop<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        config: &GameConfig,
        lane: usize,
        y: f32,
        rng: &mut R,
    ) -> Option<PowerUpKind> {
        let tuning = &config.power_ups;
        if state.power_ups.len() >= tuning.max_active || tuning.definitions.is_empty() {
            return None;
        }

        if rng.random::<f32>() > Self::drop_chance(state, config) {
            return None;
        }

        let kind = tuning.definitions[rng.random_range(0..tuning.definitions.len())].kind;
        let jitter = rand_between(rng, -0.5, 0.5) * tuning.launch_jitter;
        let id = state.next_entity_id();
        state.power_ups.push(PowerUp {
            id,
            kind,
            pos: Vec2::new(lane_center(config, lane, 0.0), y),
            vy: -tuning.launch_speed + jitter,
        });
        Some(kind)
    }

    /// Fall, magnetize and collect. Returns the kinds picked up this frame.
    pub fn update(
        &self,
        state: &mut GameState,
        config: &GameConfig,
        delta: f32,
        mut abilities: Option<&mut AbilityManager>,
        mut particles: Option<&mut ParticleSystem>,
    ) -> Vec<PowerUpKind> {
        let mut collected = Vec::new();
        if state.power_ups.is_empty() {
            return collected;
        }

        let tuning = &config.power_ups;
        let seconds = delta / 1000.0;
        let player = Vec2::new(state.player.x(config), state.player.y);
        let floor = config.playfield_height + config.canvas_padding * 2.0;

        for i in (0..state.power_ups.len()).rev() {
            let power_up = &mut state.power_ups[i];
            power_up.vy += tuning.gravity * seconds;
            power_up.pos.y += power_up.vy * seconds;

            let to_player = player - power_up.pos;
            let dist = to_player.length().max(0.001);
            if dist < tuning.magnet_radius {
                let pull = (1.0 - dist / tuning.magnet_radius) * tuning.magnet_pull;
                power_up.pos += to_player / dist * pull * seconds;
            }

            if dist < tuning.collect_radius {
                let power_up = state.power_ups.remove(i);
                if self.apply(
                    &power_up,
                    state,
                    config,
                    abilities.as_deref_mut(),
                    particles.as_deref_mut(),
                ) {
                    collected.push(power_up.kind);
                }
                continue;
            }

            if power_up.pos.y > floor {
                state.power_ups.remove(i);
            }
        }
        collected
    }

    /// Apply a collected power-up. Returns false for kinds with no definition.
    pub fn apply(
        &self,
        power_up: &PowerUp,
        state: &mut GameState,
        config: &GameConfig,
        abilities: Option<&mut AbilityManager>,
        particles: Option<&mut ParticleSystem>,
    ) -> bool {
        let Some(def) = config.power_ups.definitions.iter().find(|d| d.kind == power_up.kind) else {
            log::warn!("No definition for power-up {:?}", power_up.kind);
            return false;
        };

        let limits = &config.player;
        let player = &mut state.player;
        match def.effect {
            PowerUpEffect::FireCooldownMultiplier(factor) => {
                player.fire_cooldown =
                    clamp(player.fire_cooldown * factor, limits.min_fire_cooldown, limits.fire_cooldown);
                player.cooldown = player.cooldown.min(player.fire_cooldown);
            }
            PowerUpEffect::BulletCountIncrease(amount) => {
                player.bullet_count = (player.bullet_count + amount).clamp(1, limits.max_bullets.max(1));
                player.spread = (player.spread + limits.spread_step).min(limits.max_spread);
            }
            PowerUpEffect::PierceIncrease(amount) => {
                player.pierce = (player.pierce + amount).min(limits.max_pierce);
            }
            PowerUpEffect::ProjectileSpeedBonus(bonus) => {
                player.projectile_speed = clamp(
                    player.projectile_speed + bonus,
                    limits.projectile_speed,
                    limits.projectile_speed_max,
                );
            }
            PowerUpEffect::Heal(amount) => state.heal_player(amount),
            PowerUpEffect::Ability(grant) => {
                if let Some(abilities) = abilities {
                    abilities.add_ability(grant, state);
                }
            }
        }

        let x = state.player.x(config);
        let y = state.player.y;
        state.spawn_text_popup(format!("+{}", def.title), x, y - 30.0, def.color, 20.0);

        if let Some(particles) = particles {
            let mut burst = config.effects.power_up_collect.clone();
            burst.palette = vec![def.color, 0xffffff];
            particles.emit_burst_at(&burst, power_up.pos);
        }

        log::debug!("Collected power-up {}", def.title);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn power_up_at(state: &mut GameState, kind: PowerUpKind, pos: Vec2) {
        let id = state.next_entity_id();
        state.power_ups.push(PowerUp { id, kind, pos, vy: 0.0 });
    }

    #[test]
    fn test_drop_chance_ramps_and_caps() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        assert!((PowerUpManager::drop_chance(&state, &config) - 0.08).abs() < 1e-6);
        state.spawn_bursts_triggered = 4;
        assert!((PowerUpManager::drop_chance(&state, &config) - 0.14).abs() < 1e-6);
        state.spawn_bursts_triggered = 100;
        assert_eq!(PowerUpManager::drop_chance(&state, &config), 0.45);
    }

    #[test]
    fn test_drop_respects_active_cap() {
        let mut config = GameConfig::default();
        config.power_ups.drop_chance = 1.0;
        config.power_ups.max_drop_chance = 1.0;
        let mut state = GameState::new(&config);
        let mut rng = Pcg32::seed_from_u64(5);
        let manager = PowerUpManager::new();

        for _ in 0..20 {
            manager.maybe_drop(&mut state, &config, 2, 300.0, &mut rng);
        }
        assert_eq!(state.power_ups.len(), config.power_ups.max_active);
        let drop = &state.power_ups[0];
        assert_eq!(drop.pos.x, lane_center(&config, 2, 0.0));
        // Launched upward
        assert!(drop.vy < 0.0);
    }

    #[test]
    fn test_collect_applies_multishot() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let player_pos = Vec2::new(state.player.x(&config), state.player.y);
        power_up_at(&mut state, PowerUpKind::Multishot, player_pos);

        let collected = PowerUpManager::new().update(&mut state, &config, 16.0, None, None);
        assert_eq!(collected, vec![PowerUpKind::Multishot]);
        assert!(state.power_ups.is_empty());
        assert_eq!(state.player.bullet_count, 2);
        assert!((state.player.spread - 0.12).abs() < 1e-6);
        assert_eq!(state.text_popups.len(), 1);
        assert_eq!(state.text_popups[0].text, "+Multi-Shot");
    }

    #[test]
    fn test_stat_caps() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let manager = PowerUpManager::new();
        let mut pickup = |state: &mut GameState, kind| {
            let p = PowerUp { id: 0, kind, pos: Vec2::ZERO, vy: 0.0 };
            manager.apply(&p, state, &config, None, None);
        };

        for _ in 0..10 {
            pickup(&mut state, PowerUpKind::Multishot);
            pickup(&mut state, PowerUpKind::Pierce);
            pickup(&mut state, PowerUpKind::Velocity);
            pickup(&mut state, PowerUpKind::RapidFire);
        }
        assert_eq!(state.player.bullet_count, 5);
        assert_eq!(state.player.pierce, 4);
        assert_eq!(state.player.projectile_speed, 1080.0);
        assert_eq!(state.player.fire_cooldown, 90.0);
        assert!((state.player.spread - 0.32).abs() < 1e-6);
    }

    #[test]
    fn test_repair_heals_up_to_max() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.player.health = 3;
        let p = PowerUp { id: 0, kind: PowerUpKind::Repair, pos: Vec2::ZERO, vy: 0.0 };
        let manager = PowerUpManager::new();
        manager.apply(&p, &mut state, &config, None, None);
        assert_eq!(state.player.health, 4);
        manager.apply(&p, &mut state, &config, None, None);
        manager.apply(&p, &mut state, &config, None, None);
        assert_eq!(state.player.health, 5);
    }

    #[test]
    fn test_activatable_grants_ability() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let mut abilities = AbilityManager::new();
        let mut particles = ParticleSystem::default();
        let p = PowerUp { id: 0, kind: PowerUpKind::SideBlast, pos: Vec2::ZERO, vy: 0.0 };

        PowerUpManager::new().apply(&p, &mut state, &config, Some(&mut abilities), Some(&mut particles));
        assert!(abilities.has_ability(AbilityKind::SideBlast));
        assert_eq!(particles.len(), config.effects.power_up_collect.count as usize);
    }

    #[test]
    fn test_falls_off_playfield() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        power_up_at(&mut state, PowerUpKind::Repair, Vec2::new(1000.0, 1031.0));
        state.power_ups[0].vy = 100.0;
        PowerUpManager::new().update(&mut state, &config, 16.0, None, None);
        assert!(state.power_ups.is_empty());
    }
}
