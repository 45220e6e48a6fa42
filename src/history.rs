//! Run history log
//!
//! Keeps the most recent runs, newest first, in a JSON file. The simulation
//! never touches this; hosts record a run once the game is over.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::state::GameState;

/// Maximum number of runs kept
pub const MAX_RUNS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("run history I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("run history is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: u64,
    /// ISO-8601 time the run ended
    pub timestamp: String,
    pub score: u64,
    /// Milliseconds survived
    pub survival_time: f64,
    pub survival_time_formatted: String,
    #[serde(default = "unknown_cause")]
    pub cause: String,
    #[serde(default)]
    pub lane: Option<usize>,
    pub difficulty: u32,
    pub player_level: u32,
    pub upgrade_count: u32,
}

fn unknown_cause() -> String {
    "unknown".to_string()
}

impl RunRecord {
    pub fn from_state(state: &GameState, id: u64, timestamp: impl Into<String>) -> Self {
        let death = state.death_info.as_ref();
        Self {
            id,
            timestamp: timestamp.into(),
            score: state.score.max(0.0).floor() as u64,
            survival_time: state.elapsed,
            survival_time_formatted: format_time(state.elapsed),
            cause: death.map_or_else(unknown_cause, |d| d.cause.as_str().to_string()),
            lane: death.map(|d| d.lane),
            difficulty: state.difficulty_level.max(1),
            player_level: state.player.level.max(1),
            upgrade_count: state.upgrade_count(),
        }
    }
}

/// Aggregates over the stored runs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub total_runs: usize,
    pub best_score: u64,
    pub best_time: f64,
    pub avg_score: u64,
    pub avg_time: f64,
}

impl RunStats {
    pub fn best_time_formatted(&self) -> String {
        format_time(self.best_time)
    }

    pub fn avg_time_formatted(&self) -> String {
        format_time(self.avg_time)
    }
}

/// Newest-first log of finished runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHistory {
    runs: Vec<RunRecord>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a log from disk. A missing file is an empty history.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No run history at {}, starting fresh", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut history: RunHistory = serde_json::from_str(&json)?;
        history.runs.truncate(MAX_RUNS);
        log::info!("Loaded {} runs from {}", history.runs.len(), path.display());
        Ok(history)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::debug!("Run history saved ({} runs)", self.runs.len());
        Ok(())
    }

    /// Prepend a run, dropping the oldest beyond `MAX_RUNS`
    pub fn record(&mut self, run: RunRecord) {
        self.runs.insert(0, run);
        self.runs.truncate(MAX_RUNS);
    }

    /// The `limit` most recent runs
    pub fn recent(&self, limit: usize) -> &[RunRecord] {
        &self.runs[..limit.min(self.runs.len())]
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn stats(&self) -> RunStats {
        if self.runs.is_empty() {
            return RunStats::default();
        }

        let count = self.runs.len();
        let total_score: u64 = self.runs.iter().map(|r| r.score).sum();
        let total_time: f64 = self.runs.iter().map(|r| r.survival_time).sum();
        RunStats {
            total_runs: count,
            best_score: self.runs.iter().map(|r| r.score).max().unwrap_or(0),
            best_time: self.runs.iter().map(|r| r.survival_time).fold(0.0, f64::max),
            avg_score: (total_score as f64 / count as f64).round() as u64,
            avg_time: (total_time / count as f64).round(),
        }
    }

    /// 1-indexed position `score` would take among stored runs; ties rank ahead
    pub fn rank(&self, score: u64) -> usize {
        let mut scores: Vec<u64> = self.runs.iter().map(|r| r.score).collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        scores.iter().position(|&s| s <= score).unwrap_or(scores.len()) + 1
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }
}

/// Milliseconds as zero-padded `mm:ss`
pub fn format_time(ms: f64) -> String {
    let seconds = (ms.max(0.0) / 1000.0).floor() as u64;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::state::{DamageCause, DeathInfo};

    fn run(id: u64, score: u64, time: f64) -> RunRecord {
        RunRecord {
            id,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            score,
            survival_time: time,
            survival_time_formatted: format_time(time),
            cause: "leak".to_string(),
            lane: Some(0),
            difficulty: 1,
            player_level: 1,
            upgrade_count: 0,
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59_999.0), "00:59");
        assert_eq!(format_time(61_000.0), "01:01");
        assert_eq!(format_time(6_000_000.0), "100:00");
    }

    #[test]
    fn test_record_from_state() {
        let config = GameConfig::default();
        let mut state = GameState::new(&config);
        state.score = 1234.9;
        state.elapsed = 75_500.0;
        state.difficulty_level = 3;
        state.player.level = 4;
        state.player.upgrades.insert(crate::sim::upgrades::UpgradeKind::Damage, 2);
        state.player.upgrades.insert(crate::sim::upgrades::UpgradeKind::Pierce, 1);
        state.death_info = Some(DeathInfo {
            cause: DamageCause::EnemyProjectile,
            lane: 2,
            elapsed: 75_500.0,
            leak: None,
        });

        let record = RunRecord::from_state(&state, 7, "now");
        assert_eq!(record.score, 1234);
        assert_eq!(record.survival_time_formatted, "01:15");
        assert_eq!(record.cause, "enemy-projectile");
        assert_eq!(record.lane, Some(2));
        assert_eq!(record.difficulty, 3);
        assert_eq!(record.player_level, 4);
        assert_eq!(record.upgrade_count, 3);
    }

    #[test]
    fn test_record_without_death_is_unknown() {
        let config = GameConfig::default();
        let state = GameState::new(&config);
        let record = RunRecord::from_state(&state, 1, "now");
        assert_eq!(record.cause, "unknown");
        assert_eq!(record.lane, None);
    }

    #[test]
    fn test_history_keeps_newest_runs() {
        let mut history = RunHistory::new();
        for id in 0..(MAX_RUNS as u64 + 5) {
            history.record(run(id, id * 10, 1000.0));
        }
        assert_eq!(history.len(), MAX_RUNS);
        assert_eq!(history.recent(1)[0].id, MAX_RUNS as u64 + 4);
        assert_eq!(history.recent(100).len(), MAX_RUNS);
    }

    #[test]
    fn test_stats() {
        let mut history = RunHistory::new();
        assert_eq!(history.stats(), RunStats::default());

        history.record(run(1, 100, 30_000.0));
        history.record(run(2, 301, 90_000.0));
        let stats = history.stats();
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.best_score, 301);
        assert_eq!(stats.best_time, 90_000.0);
        assert_eq!(stats.avg_score, 201);
        assert_eq!(stats.avg_time_formatted(), "01:00");
    }

    #[test]
    fn test_rank() {
        let mut history = RunHistory::new();
        assert_eq!(history.rank(5), 1);
        history.record(run(1, 100, 0.0));
        history.record(run(2, 300, 0.0));
        history.record(run(3, 200, 0.0));

        assert_eq!(history.rank(400), 1);
        assert_eq!(history.rank(200), 2);
        assert_eq!(history.rank(150), 3);
        assert_eq!(history.rank(10), 4);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("lane-survivor-history-{}.json", std::process::id()));
        let mut history = RunHistory::new();
        history.record(run(1, 100, 1000.0));
        history.record(run(2, 200, 2000.0));
        history.save(&path).expect("save");

        let loaded = RunHistory::load(&path).expect("load");
        assert_eq!(loaded.recent(10), history.recent(10));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let path = std::env::temp_dir().join("lane-survivor-history-does-not-exist.json");
        let history = RunHistory::load(&path).expect("missing is fine");
        assert!(history.is_empty());
    }

    #[test]
    fn test_malformed_file_errors() {
        let path = std::env::temp_dir().join(format!("lane-survivor-history-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ nope").expect("write");
        assert!(matches!(RunHistory::load(&path), Err(HistoryError::Json(_))));
        let _ = std::fs::remove_file(&path);
    }
}
