//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timesteps only
//! - Seeded RNG only (cosmetic systems draw from their own streams)
//! - Stable iteration order
//! - No rendering or platform dependencies

pub mod abilities;
pub mod clock;
pub mod collision;
pub mod engine;
pub mod forces;
pub mod particles;
pub mod player;
pub mod powerups;
pub mod spawner;
pub mod state;
pub mod upgrades;
pub mod xp;

pub use abilities::{Ability, AbilityKind, AbilityManager, AbilitySummary};
pub use clock::FrameClock;
pub use engine::{EngineError, EnginePhase, GameEngine, GameHost, RenderFrame};
pub use forces::{ForceField, ShakeOptions};
pub use particles::{BlendMode, BurstOptions, EffectError, Particle, ParticleSystem};
pub use player::FireReport;
pub use powerups::{AbilityGrant, PowerUpDef, PowerUpEffect, PowerUpKind, PowerUpManager};
pub use spawner::EnemySpawner;
pub use state::{
    Companion, DamageCause, DeathInfo, Enemy, EnemyProjectile, GameState, PlayerState, PowerUp, Projectile,
    TextPopup, XpOrb,
};
pub use upgrades::{AppliedUpgrade, UpgradeKind, UpgradeManager, UpgradeOption};
pub use xp::XpManager;
