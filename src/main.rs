//! Lane Survivor headless driver
//!
//! Plays one run with a simple autopilot at a fixed 60 Hz cadence, prints the
//! run record as JSON and optionally appends it to a run-history file.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use lane_survivor::sim::{AbilityKind, EnginePhase, GameState, UpgradeOption};
use lane_survivor::{GameConfig, GameEngine, GameHost, RunHistory, RunRecord};

/// Host frame length (ms)
const FRAME_MS: f64 = 1000.0 / 60.0;
/// How far above the ship the autopilot looks for threats
const LOOKAHEAD: f32 = 420.0;

struct Options {
    config: Option<PathBuf>,
    seed: u64,
    history: Option<PathBuf>,
    max_seconds: f64,
}

impl Options {
    fn parse() -> Result<Self, String> {
        let mut options = Self {
            config: None,
            seed: 0x5eed,
            history: None,
            max_seconds: 300.0,
        };

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = |name: &str| args.next().ok_or_else(|| format!("{name} needs a value"));
            match arg.as_str() {
                "--config" => options.config = Some(PathBuf::from(value("--config")?)),
                "--history" => options.history = Some(PathBuf::from(value("--history")?)),
                "--seed" => {
                    options.seed = value("--seed")?
                        .parse()
                        .map_err(|e| format!("bad --seed: {e}"))?;
                }
                "--max-seconds" => {
                    options.max_seconds = value("--max-seconds")?
                        .parse()
                        .map_err(|e| format!("bad --max-seconds: {e}"))?;
                }
                "-h" | "--help" => return Err(String::new()),
                other => return Err(format!("unknown argument `{other}`")),
            }
        }
        Ok(options)
    }
}

/// Host side of the driver: tracks the end of the run and logs milestones
#[derive(Default)]
struct Driver {
    game_over: bool,
    next_report: f64,
}

impl GameHost for Driver {
    fn on_tick(&mut self, state: &GameState) {
        if state.elapsed >= self.next_report {
            self.next_report += 10_000.0;
            log::info!(
                "t={:>4.0}s score={} kills={} hp={} level={} enemies={}",
                state.elapsed / 1000.0,
                state.score.floor(),
                state.kills,
                state.player.health,
                state.player.level,
                state.enemies.len()
            );
        }
    }

    fn on_game_over(&mut self, state: &GameState) {
        self.game_over = true;
        log::info!("Run over after {:.1}s", state.elapsed / 1000.0);
    }

    fn on_upgrade_offer(&mut self, options: &[UpgradeOption]) {
        let names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
        log::info!("Upgrade offer: {}", names.join(", "));
    }
}

/// Threat count per lane in the band above the ship
fn lane_danger(state: &GameState, lanes: usize) -> Vec<u32> {
    let band = (state.player.y - LOOKAHEAD)..=state.player.y;
    let mut danger = vec![0; lanes];
    for enemy in state.enemies.iter().filter(|e| band.contains(&e.y)) {
        if let Some(d) = danger.get_mut(enemy.lane) {
            *d += 2;
        }
    }
    for shot in state.enemy_projectiles.iter().filter(|p| band.contains(&p.y)) {
        if let Some(d) = danger.get_mut(shot.lane) {
            *d += 1;
        }
    }
    danger
}

/// Step toward the calmest lane, spend abilities when the current lane is crowded
fn autopilot(engine: &mut GameEngine) {
    let state = engine.state();
    let lanes = engine.config().lanes;
    let danger = lane_danger(state, lanes);
    let here = state.player.lane;

    if danger.get(here).copied().unwrap_or(0) >= 4 {
        if !engine.activate_ability(AbilityKind::LaneClear) {
            engine.activate_ability(AbilityKind::SideBlast);
        }
    }

    let state = engine.state();
    if state.player.lane != state.player.target_lane {
        return;
    }
    let best = (0..lanes)
        .min_by_key(|&lane| (danger[lane], lane.abs_diff(here)))
        .unwrap_or(here);
    if danger[best] < danger[here] {
        engine.move_player(if best > here { 1 } else { -1 });
    }
}

/// Record id (unix ms) and RFC 3339 timestamp for a run ending at `ended`
fn run_stamp(ended: DateTime<Utc>) -> (u64, String) {
    let id = ended.timestamp_millis().max(0) as u64;
    (id, ended.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn play(options: &Options) -> Result<RunRecord, Box<dyn std::error::Error>> {
    let mut config = match &options.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    config.auto_fire = true;

    let mut engine = GameEngine::new(config, options.seed)?;
    let mut driver = Driver::default();
    let limit_ms = options.max_seconds * 1000.0;
    log::info!("Playing seed {} for up to {}s", options.seed, options.max_seconds);

    engine.start();
    let mut now = 0.0;
    while !driver.game_over && engine.state().elapsed < limit_ms {
        if engine.phase() == EnginePhase::AwaitingUpgradeChoice {
            let pick = engine.pending_upgrades().first().map(|o| o.kind);
            if let Some(kind) = pick {
                let applied = engine.choose_upgrade(kind)?;
                log::info!("Took {:?} level {}", applied.kind, applied.level);
            }
        }
        autopilot(&mut engine);
        engine.frame(now, &mut driver);
        now += FRAME_MS;
    }

    let (id, timestamp) = run_stamp(Utc::now());
    Ok(engine.run_record(id, timestamp))
}

fn main() {
    env_logger::init();

    let options = match Options::parse() {
        Ok(options) => options,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            eprintln!("Usage: lane-survivor [--config FILE] [--seed N] [--history FILE] [--max-seconds S]");
            std::process::exit(2);
        }
    };

    let record = match play(&options) {
        Ok(record) => record,
        Err(e) => {
            log::error!("Run failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = &options.history {
        let saved = RunHistory::load(path).and_then(|mut history| {
            let rank = history.rank(record.score);
            history.record(record.clone());
            history.save(path)?;
            Ok(rank)
        });
        match saved {
            Ok(rank) => log::info!("Run saved to {} (rank {rank})", path.display()),
            Err(e) => log::warn!("Could not update run history: {e}"),
        }
    }

    match serde_json::to_string_pretty(&record) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Could not serialize run record: {e}"),
    }
}
