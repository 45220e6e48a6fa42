//! Collision detection
//!
//! Everything is axis-aligned: lanes map to world X through `lane_center`,
//! and all bodies are boxes. Enemies and projectiles are anchored at their
//! top edge; the player ship is anchored at its center.

use glam::Vec2;

use super::state::{Enemy, EnemyProjectile, PlayerState, Projectile};
use crate::config::GameConfig;

/// Symmetric half-extent test between two center-anchored boxes
#[inline]
pub fn centered_boxes_overlap(a_center: Vec2, a_size: Vec2, b_center: Vec2, b_size: Vec2) -> bool {
    let reach = (a_size + b_size) / 2.0;
    let d = (a_center - b_center).abs();
    d.x < reach.x && d.y < reach.y
}

/// Inclusive overlap of two vertical spans given by top edge and height
#[inline]
pub fn vertical_spans_overlap(a_top: f32, a_height: f32, b_top: f32, b_height: f32) -> bool {
    a_top + a_height >= b_top && b_top + b_height >= a_top
}

/// Ship vs. enemy body contact
pub fn enemy_touches_player(config: &GameConfig, enemy: &Enemy, player: &PlayerState) -> bool {
    centered_boxes_overlap(
        Vec2::new(enemy.x(config), enemy.y),
        Vec2::new(enemy.width(config), enemy.height(config)),
        Vec2::new(player.x(config), player.y),
        Vec2::new(config.player.width, config.player.height),
    )
}

/// Enemy has crossed the bottom bound without being destroyed
pub fn enemy_leaked(config: &GameConfig, enemy: &Enemy) -> bool {
    enemy.y >= config.playfield_height - enemy.height(config)
}

/// Friendly projectile vs. enemy: vertical band AND horizontal center distance
pub fn projectile_hits_enemy(config: &GameConfig, projectile: &Projectile, enemy: &Enemy) -> bool {
    let vertical = vertical_spans_overlap(enemy.y, enemy.height(config), projectile.y, projectile.height);
    let horizontal =
        (enemy.x(config) - projectile.x(config)).abs() < (enemy.width(config) + projectile.width) / 2.0;
    vertical && horizontal
}

/// Hostile projectile vs. the ship
pub fn enemy_projectile_hits_player(
    config: &GameConfig,
    projectile: &EnemyProjectile,
    player: &PlayerState,
) -> bool {
    let player_top = player.y - config.player.height / 2.0;
    let vertical = vertical_spans_overlap(projectile.y, projectile.height, player_top, config.player.height);
    let horizontal =
        (projectile.x - player.x(config)).abs() < (config.player.width + projectile.width) / 2.0;
    vertical && horizontal
}

/// Count one enemy hit against the projectile's pierce budget.
///
/// Returns true once the shot is spent, i.e. after hit number `pierce + 1`.
pub fn consume_pierce(projectile: &mut Projectile) -> bool {
    let next = projectile.hits + 1;
    if next > projectile.pierce {
        true
    } else {
        projectile.hits = next;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Flight;
    use proptest::prelude::*;

    fn enemy(config: &GameConfig, lane: usize, y: f32) -> Enemy {
        Enemy {
            id: 1,
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
            health: 1.0,
            max_health: 1.0,
            shoot_cooldown: 0.0,
        }
    }

    fn shot(lane: usize, y: f32, pierce: u32) -> Projectile {
        Projectile {
            id: 2,
            lane,
            offset: 0.0,
            y,
            speed: 0.0,
            width: 8.0,
            height: 24.0,
            pierce,
            hits: 0,
            aim: None,
            damage: None,
            flight: Flight::Lane,
        }
    }

    #[test]
    fn test_centered_overlap_is_strict() {
        let size = Vec2::splat(10.0);
        assert!(centered_boxes_overlap(Vec2::ZERO, size, Vec2::new(9.9, 0.0), size));
        assert!(!centered_boxes_overlap(Vec2::ZERO, size, Vec2::new(10.0, 0.0), size));
        assert!(!centered_boxes_overlap(Vec2::ZERO, size, Vec2::new(0.0, 10.0), size));
    }

    #[test]
    fn test_vertical_spans_touching_edges_overlap() {
        assert!(vertical_spans_overlap(0.0, 10.0, 10.0, 5.0));
        assert!(!vertical_spans_overlap(0.0, 10.0, 10.1, 5.0));
    }

    #[test]
    fn test_projectile_hits_same_lane_only() {
        let config = GameConfig::default();
        let e = enemy(&config, 1, 400.0);
        assert!(projectile_hits_enemy(&config, &shot(1, 420.0, 0), &e));
        assert!(!projectile_hits_enemy(&config, &shot(2, 420.0, 0), &e));
        assert!(!projectile_hits_enemy(&config, &shot(1, 500.0, 0), &e));
    }

    #[test]
    fn test_companion_projectile_uses_free_x() {
        let config = GameConfig::default();
        let e = enemy(&config, 0, 400.0);
        let mut p = shot(3, 410.0, 0);
        p.flight = Flight::Vector { x: e.x(&config) + 5.0, vel: Vec2::ZERO };
        assert!(projectile_hits_enemy(&config, &p, &e));
    }

    #[test]
    fn test_enemy_touches_player() {
        let config = GameConfig::default();
        let player = PlayerState::new(&config);
        let near = enemy(&config, player.lane, player.y - 10.0);
        let other_lane = enemy(&config, player.lane + 1, player.y);
        assert!(enemy_touches_player(&config, &near, &player));
        assert!(!enemy_touches_player(&config, &other_lane, &player));
    }

    #[test]
    fn test_enemy_leaked_uses_scaled_height() {
        let config = GameConfig::default();
        let mut e = enemy(&config, 0, 1000.0 - 38.0);
        assert!(enemy_leaked(&config, &e));
        e.size = 1.6;
        e.y = 1000.0 - 38.0 * 1.6 - 1.0;
        assert!(!enemy_leaked(&config, &e));
    }

    proptest! {
        #[test]
        fn prop_pierce_spent_after_p_plus_one_hits(pierce in 0u32..8) {
            let mut p = shot(0, 0.0, pierce);
            let mut hits = 0;
            loop {
                hits += 1;
                if consume_pierce(&mut p) {
                    break;
                }
            }
            prop_assert_eq!(hits, pierce + 1);
        }
    }
}
