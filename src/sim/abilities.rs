//! Special abilities granted by rare power-ups
//!
//! `LaneClear` and `SideBlast` are charge-based and spent on activation.
//! `DamageTrail` is passive: it starts on pickup and burns enemies the ship
//! sweeps past while changing lanes, until it expires.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::particles::ParticleSystem;
use super::powerups::AbilityGrant;
use super::state::{GameState, XpOrb};
use crate::config::GameConfig;
use crate::lane_center;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbilityKind {
    LaneClear,
    DamageTrail,
    SideBlast,
}

impl AbilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbilityKind::LaneClear => "lane-clear",
            AbilityKind::DamageTrail => "damage-trail",
            AbilityKind::SideBlast => "side-blast",
        }
    }
}

/// An acquired ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub kind: AbilityKind,
    pub charges: Option<u32>,
    /// Total duration for timed abilities (ms)
    pub duration: Option<f32>,
    pub active: bool,
}

/// Inventory entry for HUD display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySummary {
    pub kind: AbilityKind,
    pub charges: Option<u32>,
    pub duration: Option<f32>,
    /// Remaining trail time (ms)
    pub time_remaining: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct AbilityManager {
    abilities: Vec<Ability>,
}

impl AbilityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a granted ability.
    ///
    /// Charges stack onto an existing entry of the same kind. A trail pickup
    /// starts (or restarts) the trail timer immediately.
    pub fn add_ability(&mut self, grant: AbilityGrant, state: &mut GameState) {
        match grant {
            AbilityGrant::Charges { ability, charges } => {
                if let Some(existing) = self.abilities.iter_mut().find(|a| a.kind == ability && !a.active) {
                    existing.charges = Some(existing.charges.unwrap_or(0) + charges);
                } else {
                    self.abilities.push(Ability {
                        kind: ability,
                        charges: Some(charges),
                        duration: None,
                        active: false,
                    });
                }
            }
            AbilityGrant::Timed { ability, duration } => {
                self.abilities.retain(|a| a.kind != ability);
                self.abilities.push(Ability {
                    kind: ability,
                    charges: None,
                    duration: Some(duration),
                    active: ability == AbilityKind::DamageTrail,
                });
                if ability == AbilityKind::DamageTrail {
                    state.player.trail_active = true;
                    state.player.trail_until = state.elapsed + duration as f64;
                }
            }
        }
        log::debug!("Ability acquired: {}", grant_kind(grant).as_str());
    }

    /// Trigger an activatable ability. Returns false if none is available.
    pub fn activate(
        &mut self,
        kind: AbilityKind,
        state: &mut GameState,
        config: &GameConfig,
        particles: Option<&mut ParticleSystem>,
    ) -> bool {
        let Some(index) = self.abilities.iter().position(|a| a.kind == kind && !a.active) else {
            return false;
        };

        match kind {
            AbilityKind::LaneClear => lane_clear(state, config, particles),
            AbilityKind::SideBlast => side_blast(state, config, particles),
            AbilityKind::DamageTrail => return false,
        }

        let ability = &mut self.abilities[index];
        let spent = match ability.charges.as_mut() {
            Some(charges) => {
                *charges = charges.saturating_sub(1);
                *charges == 0
            }
            None => {
                ability.active = true;
                false
            }
        };
        if spent {
            self.abilities.remove(index);
        }
        log::debug!("Ability activated: {}", kind.as_str());
        true
    }

    /// Expire the trail, or burn enemies along the ship's path while moving
    pub fn update(
        &mut self,
        state: &mut GameState,
        config: &GameConfig,
        delta: f32,
        particles: Option<&mut ParticleSystem>,
    ) {
        if !state.player.trail_active {
            return;
        }

        if state.elapsed > state.player.trail_until {
            state.player.trail_active = false;
            state.player.trail_until = 0.0;
            self.abilities.retain(|a| a.kind != AbilityKind::DamageTrail);
            return;
        }

        if state.player.lane_progress != 0.0 {
            apply_trail_damage(state, config, delta, particles);
        }
    }

    pub fn abilities(&self, state: &GameState) -> Vec<AbilitySummary> {
        self.abilities
            .iter()
            .map(|a| AbilitySummary {
                kind: a.kind,
                charges: a.charges,
                duration: a.duration,
                time_remaining: (a.kind == AbilityKind::DamageTrail && state.player.trail_active)
                    .then(|| state.player.trail_until - state.elapsed),
            })
            .collect()
    }

    pub fn has_ability(&self, kind: AbilityKind) -> bool {
        self.abilities.iter().any(|a| a.kind == kind)
    }

    pub fn clear(&mut self) {
        self.abilities.clear();
    }
}

fn grant_kind(grant: AbilityGrant) -> AbilityKind {
    match grant {
        AbilityGrant::Charges { ability, .. } | AbilityGrant::Timed { ability, .. } => ability,
    }
}

/// Destroy every enemy in `lane`, awarding `reward` of the normal score and XP
fn clear_lane(state: &mut GameState, config: &GameConfig, lane: usize, reward: f32) -> u32 {
    let mut killed = 0;
    for i in (0..state.enemies.len()).rev() {
        if state.enemies[i].lane != lane {
            continue;
        }
        let enemy = state.enemies.remove(i);
        let center = enemy.center(config);
        award_kill(state, config, center, enemy.score_multiplier(), reward);
        killed += 1;
    }
    killed
}

/// Score and XP for an ability kill. `kills` only counts projectile kills.
fn award_kill(state: &mut GameState, config: &GameConfig, at: Vec2, score_multiplier: f32, reward: f32) {
    state.add_score((score_multiplier * config.difficulty.score_per_enemy * reward) as f64);
    state.xp_orbs.push(XpOrb {
        pos: at,
        vy: -config.abilities.orb_launch_speed,
        size: config.xp.orb_size,
        value: reward,
    });
}

fn lane_clear(state: &mut GameState, config: &GameConfig, particles: Option<&mut ParticleSystem>) {
    let lane = state.player.lane;
    let killed = clear_lane(state, config, lane, 1.0);
    let lane_x = lane_center(config, lane, 0.0);

    if let Some(particles) = particles {
        let mut y = 0.0;
        while y < config.playfield_height {
            particles.emit_burst_at(&config.effects.lane_clear, Vec2::new(lane_x, y + config.canvas_padding));
            y += 60.0;
        }
    }

    state.spawn_text_popup(
        format!("LANE CLEARED! +{killed}"),
        lane_x,
        config.playfield_height / 2.0,
        0xfbbf24,
        28.0,
    );
}

fn side_blast(state: &mut GameState, config: &GameConfig, mut particles: Option<&mut ParticleSystem>) {
    let lane = state.player.lane;
    let neighbors = [lane.checked_sub(1), Some(lane + 1).filter(|&l| l < config.lanes)];

    let mut total = 0;
    for side in neighbors.into_iter().flatten() {
        total += clear_lane(state, config, side, config.abilities.side_blast_reward);
        if let Some(particles) = particles.as_deref_mut() {
            let at = Vec2::new(lane_center(config, side, 0.0), state.player.y);
            particles.emit_burst_at(&config.effects.side_blast, at);
        }
    }

    if total > 0 {
        let x = state.player.x(config);
        let y = state.player.y - 40.0;
        state.spawn_text_popup(format!("SIDE BLAST! +{total}"), x, y, 0x8b5cf6, 24.0);
    }
}

/// Burn enemies near the ship's row in both the source and destination lane
fn apply_trail_damage(
    state: &mut GameState,
    config: &GameConfig,
    delta: f32,
    mut particles: Option<&mut ParticleSystem>,
) {
    let damage = config.abilities.trail_damage_per_second * delta / 1000.0;
    let player = &state.player;
    let (from, to, row) = (player.lane, player.target_lane, player.y);

    for i in (0..state.enemies.len()).rev() {
        let enemy = &mut state.enemies[i];
        if enemy.lane != from && enemy.lane != to {
            continue;
        }
        let center = enemy.center(config);
        if (center.y - row).abs() >= config.abilities.trail_band {
            continue;
        }

        enemy.health -= damage;
        if let Some(particles) = particles.as_deref_mut() {
            particles.emit_burst_at(&config.effects.trail_damage, center);
        }
        if enemy.health <= 0.0 {
            let enemy = state.enemies.remove(i);
            award_kill(state, config, center, enemy.score_multiplier(), config.abilities.trail_reward);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Enemy;

    fn enemy(config: &GameConfig, lane: usize, y: f32, health: f32) -> Enemy {
        Enemy {
            id: 0,
            lane,
            y,
            speed: 0.0,
            size: 1.0,
            can_move: false,
            move_speed: 0.0,
            lateral_offset: 0.0,
            lateral_direction: 1.0,
            lateral_phase: 0.0,
            type_data: config.enemy.types[0],
            health,
            max_health: health,
            shoot_cooldown: 0.0,
        }
    }

    fn lane_clear_charge() -> AbilityGrant {
        AbilityGrant::Charges { ability: AbilityKind::LaneClear, charges: 1 }
    }

    #[test]
    fn test_lane_clear_kills_only_player_lane() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let lane = state.player.lane;
        state.enemies.push(enemy(&config, lane, 100.0, 3.0));
        state.enemies.push(enemy(&config, lane + 1, 100.0, 1.0));
        state.enemies.push(enemy(&config, lane, 500.0, 1.0));

        let mut abilities = AbilityManager::new();
        abilities.add_ability(lane_clear_charge(), &mut state);
        assert!(abilities.activate(AbilityKind::LaneClear, &mut state, &config, None));

        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.enemies[0].lane, lane + 1);
        assert_eq!(state.kills, 0);
        assert_eq!(state.score, 50.0);
        assert_eq!(state.xp_orbs.len(), 2);
        assert_eq!(state.text_popups[0].text, "LANE CLEARED! +2");

        // Single charge spent
        assert!(!abilities.has_ability(AbilityKind::LaneClear));
        assert!(!abilities.activate(AbilityKind::LaneClear, &mut state, &config, None));
    }

    #[test]
    fn test_side_blast_half_reward_and_bounds() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.player.lane = 0;
        state.player.target_lane = 0;
        state.enemies.push(enemy(&config, 0, 100.0, 1.0));
        state.enemies.push(enemy(&config, 1, 100.0, 1.0));

        let mut abilities = AbilityManager::new();
        abilities.add_ability(AbilityGrant::Charges { ability: AbilityKind::SideBlast, charges: 2 }, &mut state);
        assert!(abilities.activate(AbilityKind::SideBlast, &mut state, &config, None));

        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.enemies[0].lane, 0);
        assert_eq!(state.score, 12.5);
        assert_eq!(state.xp_orbs[0].value, 0.5);
        assert_eq!(abilities.abilities(&state)[0].charges, Some(1));
    }

    #[test]
    fn test_charges_stack() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let mut abilities = AbilityManager::new();
        abilities.add_ability(lane_clear_charge(), &mut state);
        abilities.add_ability(lane_clear_charge(), &mut state);
        assert_eq!(abilities.abilities(&state).len(), 1);
        assert_eq!(abilities.abilities(&state)[0].charges, Some(2));
    }

    #[test]
    fn test_trail_burns_while_moving_and_expires() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let mut abilities = AbilityManager::new();
        abilities.add_ability(
            AbilityGrant::Timed { ability: AbilityKind::DamageTrail, duration: 1000.0 },
            &mut state,
        );
        assert!(state.player.trail_active);
        // Passive: cannot be activated
        assert!(!abilities.activate(AbilityKind::DamageTrail, &mut state, &config, None));

        let lane = state.player.lane;
        let near_y = state.player.y - config.enemy.height / 2.0;
        state.enemies.push(enemy(&config, lane, near_y, 1.0));
        state.enemies.push(enemy(&config, lane, 100.0, 1.0));

        // Stationary: no burn
        abilities.update(&mut state, &config, 16.0, None);
        assert_eq!(state.enemies[0].health, 1.0);

        state.player.target_lane = lane + 1;
        state.player.lane_progress = 0.2;
        abilities.update(&mut state, &config, 100.0, None);
        // 30/s for 100ms burns the nearby enemy down, the distant one is untouched
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.enemies[0].y, 100.0);
        assert_eq!(state.kills, 0);
        assert!((state.score - 7.5).abs() < 1e-4);

        let summary = abilities.abilities(&state);
        assert_eq!(summary[0].time_remaining, Some(1000.0));

        state.elapsed = 1000.5;
        abilities.update(&mut state, &config, 16.0, None);
        assert!(!state.player.trail_active);
        assert!(!abilities.has_ability(AbilityKind::DamageTrail));
    }
}
