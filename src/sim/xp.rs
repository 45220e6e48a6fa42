//! Experience orbs and leveling

use glam::Vec2;

use super::state::{GameState, XpOrb};
use crate::config::GameConfig;
use crate::lane_center;

/// Orb physics and the level curve
#[derive(Debug, Clone, Copy, Default)]
pub struct XpManager;

impl XpManager {
    pub fn new() -> Self {
        Self
    }

    /// Drop a resting orb worth one point
    pub fn spawn_xp(&self, state: &mut GameState, config: &GameConfig, pos: Vec2) {
        state.xp_orbs.push(XpOrb {
            pos,
            vy: 0.0,
            size: config.xp.orb_size,
            value: 1.0,
        });
    }

    /// Move, magnetize and collect orbs.
    ///
    /// Returns true on a level-up; remaining orbs are left for the next frame
    /// so at most one level is gained per call.
    pub fn update(&self, state: &mut GameState, config: &GameConfig, delta: f32) -> bool {
        let tuning = &config.xp;
        let seconds = delta / 1000.0;
        let player = Vec2::new(lane_center(config, state.player.lane, 0.0), state.player.y);
        let floor = config.playfield_height + tuning.offscreen_margin;

        for i in (0..state.xp_orbs.len()).rev() {
            let orb = &mut state.xp_orbs[i];
            orb.vy += tuning.gravity * seconds;
            orb.pos.y += orb.vy * seconds;

            let to_player = player - orb.pos;
            let dist = to_player.length();
            if dist < tuning.magnet_radius && dist > f32::EPSILON {
                orb.pos += to_player / dist * tuning.pull_speed * seconds;
            }

            if dist < tuning.collect_radius {
                let orb = state.xp_orbs.remove(i);
                state.player.xp += orb.value;
                if state.player.xp >= state.player.xp_to_next {
                    self.level_up(state, config);
                    return true;
                }
                continue;
            }

            if orb.pos.y > floor {
                state.xp_orbs.remove(i);
            }
        }
        false
    }

    /// Grant XP directly. Returns true if it triggered a level-up.
    pub fn add_xp(&self, state: &mut GameState, config: &GameConfig, amount: f32) -> bool {
        state.player.xp += amount;
        if state.player.xp >= state.player.xp_to_next {
            self.level_up(state, config);
            return true;
        }
        false
    }

    /// Carry the surplus over and grow the threshold
    pub fn level_up(&self, state: &mut GameState, config: &GameConfig) {
        let player = &mut state.player;
        player.xp -= player.xp_to_next;
        player.level += 1;
        player.xp_to_next = (player.xp_to_next * config.xp.level_growth).floor();
        log::info!("Level up: reached level {} (next at {} xp)", player.level, player.xp_to_next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_threshold_levels_once() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let xp = XpManager::new();

        assert!(!xp.add_xp(&mut state, &config, 4.0));
        assert!(xp.add_xp(&mut state, &config, 1.0));
        assert_eq!(state.player.level, 2);
        assert_eq!(state.player.xp, 0.0);
        assert_eq!(state.player.xp_to_next, 7.0);
    }

    #[test]
    fn test_surplus_carries_over() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let xp = XpManager::new();
        assert!(xp.add_xp(&mut state, &config, 6.5));
        assert_eq!(state.player.xp, 1.5);
        // 7 * 1.5 = 10.5, floored
        xp.level_up(&mut state, &config);
        assert_eq!(state.player.xp_to_next, 10.0);
    }

    #[test]
    fn test_orb_collected_near_player() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let xp = XpManager::new();
        let at = Vec2::new(lane_center(&config, state.player.lane, 0.0), state.player.y - 10.0);
        xp.spawn_xp(&mut state, &config, at);

        assert!(!xp.update(&mut state, &config, 16.0));
        assert!(state.xp_orbs.is_empty());
        assert_eq!(state.player.xp, 1.0);
    }

    #[test]
    fn test_collection_stops_at_level_up() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.player.xp = 4.0;
        let xp = XpManager::new();
        let at = Vec2::new(lane_center(&config, state.player.lane, 0.0), state.player.y);
        xp.spawn_xp(&mut state, &config, at);
        xp.spawn_xp(&mut state, &config, at);

        assert!(xp.update(&mut state, &config, 16.0));
        assert_eq!(state.player.level, 2);
        assert_eq!(state.xp_orbs.len(), 1);
    }

    #[test]
    fn test_offscreen_orbs_discarded() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let xp = XpManager::new();
        xp.spawn_xp(&mut state, &config, Vec2::new(0.0, 1049.99));
        state.xp_orbs[0].vy = 100.0;
        xp.update(&mut state, &config, 16.0);
        assert!(state.xp_orbs.is_empty());
        assert_eq!(state.player.xp, 0.0);
    }

    #[test]
    fn test_magnet_pulls_within_radius() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let xp = XpManager::new();
        let px = lane_center(&config, state.player.lane, 0.0);
        let py = state.player.y;
        xp.spawn_xp(&mut state, &config, Vec2::new(px + 100.0, py));
        xp.update(&mut state, &config, 100.0);
        assert!(state.xp_orbs[0].pos.x < px + 100.0 - 40.0);
    }
}
