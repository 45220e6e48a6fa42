//! Player ship movement and firing
//!
//! The ship sits on a discrete lane and slides to its target lane over
//! `move_duration`; `lane_progress` carries the fraction of the slide.

use super::state::{Aim, Flight, GameState, Projectile};
use crate::config::GameConfig;

/// Where a volley left the ship, for muzzle effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireReport {
    pub lane: usize,
    pub muzzle_y: f32,
}

/// Shift the target lane by `direction`, clamped to the playfield
pub fn move_lane(state: &mut GameState, config: &GameConfig, direction: i32) {
    if state.is_game_over {
        return;
    }
    let max_lane = config.lanes.saturating_sub(1) as i64;
    let next = (state.player.target_lane as i64 + direction as i64).clamp(0, max_lane);
    state.player.target_lane = next as usize;
}

/// Advance the lane slide, invulnerability and weapon cooldown
pub fn update(state: &mut GameState, config: &GameConfig, delta: f32) {
    let elapsed = state.elapsed;
    let player = &mut state.player;

    if player.lane != player.target_lane {
        let step: f32 = if player.target_lane > player.lane { 1.0 } else { -1.0 };
        player.lane_progress += delta / config.player.move_duration * step;
        if player.lane_progress.abs() >= 1.0 {
            player.lane = if step > 0.0 { player.lane + 1 } else { player.lane - 1 };
            player.lane_progress = 0.0;
        }
    } else {
        player.lane_progress = 0.0;
    }

    if player.invulnerable && elapsed > player.invulnerable_until {
        player.invulnerable = false;
    }

    if player.cooldown > 0.0 {
        player.cooldown -= delta;
    }
}

pub fn can_fire(state: &GameState) -> bool {
    !state.is_game_over && state.player.cooldown <= 0.0
}

/// Fire a volley if the weapon is ready
pub fn fire(state: &mut GameState, config: &GameConfig) -> Option<FireReport> {
    if !can_fire(state) {
        return None;
    }

    let lane = state.player.lane;
    let muzzle_y = (state.player.y - config.projectile.height - 6.0).max(0.0);
    let bullets = state.player.bullet_count.max(1);
    let center = (bullets - 1) as f32 / 2.0;
    let aim = Aim {
        target_lane: lane,
        strength: state.player.auto_aim_strength,
        cross_lane: state.player.auto_aim_strength >= config.projectile.cross_lane_aim_threshold,
    };

    for i in 0..bullets {
        let id = state.next_entity_id();
        state.projectiles.push(Projectile {
            id,
            lane,
            offset: (i as f32 - center) * state.player.spread,
            y: muzzle_y,
            speed: state.player.projectile_speed,
            width: config.projectile.width,
            height: config.projectile.height,
            pierce: state.player.pierce,
            hits: 0,
            aim: Some(aim),
            damage: None,
            flight: Flight::Lane,
        });
    }

    let mut cooldown = state.player.fire_cooldown;
    if state.combo.is_boost_active {
        cooldown *= config.combo.fire_rate_boost;
    }
    state.player.cooldown = cooldown;

    Some(FireReport { lane, muzzle_y })
}
