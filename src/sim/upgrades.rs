//! Level-up upgrades
//!
//! Each level-up offers up to three distinct upgrades drawn uniformly from the
//! eligible pool. Every third level of the same upgrade is a prestige tier with
//! a doubled effect.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{GameState, PlayerState};
use crate::config::GameConfig;

/// Options presented per level-up
pub const OFFER_SIZE: usize = 3;
/// Levels per prestige tier
pub const PRESTIGE_EVERY: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpgradeKind {
    Damage,
    FireRate,
    BulletCount,
    Pierce,
    BulletSpeed,
    AutoAim,
    Companion,
    CompanionPower,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 8] = [
        UpgradeKind::Damage,
        UpgradeKind::FireRate,
        UpgradeKind::BulletCount,
        UpgradeKind::Pierce,
        UpgradeKind::BulletSpeed,
        UpgradeKind::AutoAim,
        UpgradeKind::Companion,
        UpgradeKind::CompanionPower,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UpgradeKind::Damage => "Attack",
            UpgradeKind::FireRate => "Fire Rate",
            UpgradeKind::BulletCount => "Multishot",
            UpgradeKind::Pierce => "Pierce",
            UpgradeKind::BulletSpeed => "Bullet Speed",
            UpgradeKind::AutoAim => "Homing Bullets",
            UpgradeKind::Companion => "Flanking Support",
            UpgradeKind::CompanionPower => "Companion Firepower",
        }
    }

    /// Level cap, if any
    pub fn max_level(&self) -> Option<u32> {
        match self {
            UpgradeKind::Companion => Some(3),
            UpgradeKind::CompanionPower => Some(2),
            _ => None,
        }
    }

    /// Extra gate on top of the level cap
    pub fn can_select(&self, player: &PlayerState) -> bool {
        match self {
            UpgradeKind::CompanionPower => player.companion_count > 0,
            _ => true,
        }
    }

    /// Player-facing description of the next level, reflecting current stats
    pub fn describe(&self, player: &PlayerState) -> String {
        match self {
            UpgradeKind::Damage => format!("+1 Damage ({} -> {})", player.damage, player.damage + 1.0),
            UpgradeKind::FireRate => "+25% Fire Rate".to_string(),
            UpgradeKind::BulletCount => {
                format!("+1 Bullet ({} -> {})", player.bullet_count, player.bullet_count + 1)
            }
            UpgradeKind::Pierce => format!("+1 Pierce ({} -> {})", player.pierce, player.pierce + 1),
            UpgradeKind::BulletSpeed => "+20% Faster".to_string(),
            UpgradeKind::AutoAim => "+50% Better Tracking".to_string(),
            UpgradeKind::Companion if player.companion_count == 0 => {
                "Spawn 2 friendly shooters to flank you".to_string()
            }
            UpgradeKind::Companion => format!(
                "Add 2 more companions ({} -> {})",
                player.companion_count,
                player.companion_count + 2
            ),
            UpgradeKind::CompanionPower => "Companions shoot 50% faster".to_string(),
        }
    }
}

/// One entry of a level-up offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeOption {
    pub kind: UpgradeKind,
    pub name: String,
    pub description: String,
    /// Level the upgrade reaches if chosen
    pub level: u32,
}

/// Result of applying an upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedUpgrade {
    pub kind: UpgradeKind,
    pub level: u32,
    pub prestige: bool,
}

#[derive(Debug, Clone)]
pub struct UpgradeManager {
    catalog: Vec<UpgradeKind>,
}

impl UpgradeManager {
    pub fn new() -> Self {
        Self::with_catalog(UpgradeKind::ALL.to_vec())
    }

    /// Restrict offers to a subset of upgrades
    pub fn with_catalog(catalog: Vec<UpgradeKind>) -> Self {
        Self { catalog }
    }

    pub fn level(player: &PlayerState, kind: UpgradeKind) -> u32 {
        player.upgrades.get(&kind).copied().unwrap_or(0)
    }

    /// Upgrades that may currently be offered
    pub fn eligible(&self, player: &PlayerState) -> Vec<UpgradeKind> {
        self.catalog
            .iter()
            .copied()
            .filter(|kind| {
                let below_cap = kind.max_level().is_none_or(|max| Self::level(player, *kind) < max);
                below_cap && kind.can_select(player)
            })
            .collect()
    }

    /// Draw up to three distinct options. A short pool yields a short offer.
    pub fn get_upgrade_options<R: Rng + ?Sized>(&self, player: &PlayerState, rng: &mut R) -> Vec<UpgradeOption> {
        let mut pool = self.eligible(player);
        let mut options = Vec::with_capacity(OFFER_SIZE.min(pool.len()));
        while options.len() < OFFER_SIZE && !pool.is_empty() {
            let kind = pool.remove(rng.random_range(0..pool.len()));
            options.push(UpgradeOption {
                kind,
                name: kind.name().to_string(),
                description: kind.describe(player),
                level: Self::level(player, kind) + 1,
            });
        }
        options
    }

    /// Apply one level of `kind` to the player
    pub fn apply_upgrade(&self, kind: UpgradeKind, state: &mut GameState, config: &GameConfig) -> AppliedUpgrade {
        let player = &mut state.player;
        let level = Self::level(player, kind) + 1;
        player.upgrades.insert(kind, level);
        let prestige = level % PRESTIGE_EVERY == 0;
        let tier = if prestige { 2 } else { 1 };

        match kind {
            UpgradeKind::Damage => player.damage += tier as f32,
            UpgradeKind::FireRate => {
                player.fire_cooldown =
                    (player.fire_cooldown * 0.75f32.powi(tier)).max(config.player.min_fire_cooldown);
            }
            UpgradeKind::BulletCount => {
                player.bullet_count += tier as u32;
                player.spread = (player.spread + config.player.spread_step).min(config.player.max_spread);
            }
            UpgradeKind::Pierce => player.pierce += tier as u32,
            UpgradeKind::BulletSpeed => player.projectile_speed *= 1.2f32.powi(tier),
            UpgradeKind::AutoAim => player.auto_aim_strength *= 1.5f32.powi(tier),
            UpgradeKind::Companion => player.companion_count += 2 * tier as u32,
            UpgradeKind::CompanionPower => player.companion_power += 0.5 * tier as f32,
        }

        if prestige {
            let x = state.player.x(config);
            let y = state.player.y - 60.0;
            state.spawn_text_popup(format!("{} PRESTIGE!", kind.name().to_uppercase()), x, y, 0xfbbf24, 26.0);
            log::info!("Prestige: {} reached level {}", kind.name(), level);
        } else {
            log::info!("Upgrade: {} level {}", kind.name(), level);
        }

        AppliedUpgrade { kind, level, prestige }
    }
}

impl Default for UpgradeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    #[test]
    fn test_offer_is_three_distinct() {
        let config = GameConfig::default();
        let state = GameState::new(&config);
        let manager = UpgradeManager::new();
        let mut rng = Pcg32::seed_from_u64(11);

        for _ in 0..50 {
            let options = manager.get_upgrade_options(&state.player, &mut rng);
            assert_eq!(options.len(), 3);
            let kinds: HashSet<_> = options.iter().map(|o| o.kind).collect();
            assert_eq!(kinds.len(), 3);
            // No companions yet, so companion power is gated
            assert!(!kinds.contains(&UpgradeKind::CompanionPower));
        }
    }

    #[test]
    fn test_short_pool_yields_short_offer() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let manager = UpgradeManager::with_catalog(vec![
            UpgradeKind::Companion,
            UpgradeKind::CompanionPower,
            UpgradeKind::Damage,
            UpgradeKind::Pierce,
        ]);
        state.player.companion_count = 6;
        state.player.upgrades.insert(UpgradeKind::Companion, 3);
        state.player.upgrades.insert(UpgradeKind::CompanionPower, 2);

        let mut rng = Pcg32::seed_from_u64(3);
        let options = manager.get_upgrade_options(&state.player, &mut rng);
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| matches!(o.kind, UpgradeKind::Damage | UpgradeKind::Pierce)));
    }

    #[test]
    fn test_empty_pool() {
        let config = GameConfig::default();
        let state = GameState::new(&config);
        let manager = UpgradeManager::with_catalog(vec![UpgradeKind::CompanionPower]);
        let mut rng = Pcg32::seed_from_u64(3);
        assert!(manager.get_upgrade_options(&state.player, &mut rng).is_empty());
    }

    #[test]
    fn test_every_third_level_is_prestige() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let manager = UpgradeManager::new();

        let first = manager.apply_upgrade(UpgradeKind::Damage, &mut state, &config);
        let second = manager.apply_upgrade(UpgradeKind::Damage, &mut state, &config);
        assert!(!first.prestige && !second.prestige);
        assert_eq!(state.player.damage, 3.0);
        assert!(state.text_popups.is_empty());

        let third = manager.apply_upgrade(UpgradeKind::Damage, &mut state, &config);
        assert!(third.prestige);
        assert_eq!(third.level, 3);
        assert_eq!(state.player.damage, 5.0);
        assert_eq!(state.text_popups[0].text, "ATTACK PRESTIGE!");
        assert_eq!(state.upgrade_count(), 3);
    }

    #[test]
    fn test_fire_rate_respects_floor() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let manager = UpgradeManager::new();
        for _ in 0..10 {
            manager.apply_upgrade(UpgradeKind::FireRate, &mut state, &config);
        }
        assert_eq!(state.player.fire_cooldown, config.player.min_fire_cooldown);
    }

    #[test]
    fn test_companion_unlocks_power() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        let manager = UpgradeManager::new();
        assert!(!manager.eligible(&state.player).contains(&UpgradeKind::CompanionPower));

        manager.apply_upgrade(UpgradeKind::Companion, &mut state, &config);
        assert_eq!(state.player.companion_count, 2);
        assert!(manager.eligible(&state.player).contains(&UpgradeKind::CompanionPower));
        assert_eq!(
            UpgradeKind::Companion.describe(&state.player),
            "Add 2 more companions (2 -> 4)"
        );
    }
}
