//! Checkpointable progress for long-running operations.
//!
//! `ProgressState` is an explicit value passed through the sync engine and
//! deletion executor; `ProgressStore` is the storage port that persists it.
//! Nothing reads or writes the progress file except through the store.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub deleted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    /// Last enumeration offset processed.
    pub cursor: u64,
    /// Back-to-back already-seen items; feeds cycling detection.
    pub consecutive_repeats: u32,
    pub stats: RunStats,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            cursor: 0,
            consecutive_repeats: 0,
            stats: RunStats::default(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn has_prior_progress(&self) -> bool {
        self.cursor > 0
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage port for one operation's progress document.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Restore saved progress, or a fresh state when none exists.
    pub fn load(&self) -> Result<ProgressState> {
        if !self.path.exists() {
            return Ok(ProgressState::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, state: &mut ProgressState) -> Result<()> {
        state.updated_at = Utc::now();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Explicit reset; the only way a checkpoint goes away.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_without_file_is_fresh() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));

        let state = store.load().unwrap();
        assert_eq!(state.cursor, 0);
        assert_eq!(state.stats, RunStats::default());
        assert!(!state.has_prior_progress());
    }

    #[test]
    fn save_restore_clear() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));

        let mut state = ProgressState::new();
        state.cursor = 150;
        state.stats.downloaded = 42;
        state.consecutive_repeats = 7;
        store.save(&mut state).unwrap();

        let restored = store.load().unwrap();
        assert_eq!(restored.cursor, 150);
        assert_eq!(restored.stats.downloaded, 42);
        assert_eq!(restored.consecutive_repeats, 7);
        assert!(restored.has_prior_progress());

        store.clear().unwrap();
        assert_eq!(store.load().unwrap().cursor, 0);
    }
}
