//! Typed configuration loaded from `mira.toml`.
//!
//! Every operational tunable lives here with a serde default matching the
//! reference values, so a missing file yields a working configuration and
//! nothing is edited in source to change behavior.

use crate::criteria::{default_rules, Rule};
use crate::error::{MiraError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Consecutive already-seen items that end a full scan.
    #[serde(default = "default_cycle_threshold_full")]
    pub cycle_threshold_full: u32,
    /// Consecutive already-seen items that end a windowed scan.
    #[serde(default = "default_cycle_threshold_windowed")]
    pub cycle_threshold_windowed: u32,
    /// Persist progress every this many processed items.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_cycle_threshold_full() -> u32 {
    500
}
fn default_cycle_threshold_windowed() -> u32 {
    100
}
fn default_checkpoint_interval() -> u64 {
    50
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    5
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cycle_threshold_full: default_cycle_threshold_full(),
            cycle_threshold_windowed: default_cycle_threshold_windowed(),
            checkpoint_interval: default_checkpoint_interval(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// Laplacian variance below this is considered blurry.
    #[serde(default = "default_blur_threshold")]
    pub blur_threshold: f64,
    /// Mean luma below this is considered dark.
    #[serde(default = "default_darkness_threshold")]
    pub darkness_threshold: f64,
    /// Fingerprint Hamming distance at or below this groups as duplicates.
    #[serde(default = "default_fingerprint_distance")]
    pub fingerprint_distance: u32,
    /// Screenshots older than this many months are suspect.
    #[serde(default = "default_screenshot_age_months")]
    pub screenshot_age_months: f64,
    /// Filename globs that mark an image as a screenshot.
    #[serde(default = "default_screenshot_patterns")]
    pub screenshot_patterns: Vec<String>,
}

fn default_blur_threshold() -> f64 {
    100.0
}
fn default_darkness_threshold() -> f64 {
    30.0
}
fn default_fingerprint_distance() -> u32 {
    5
}
fn default_screenshot_age_months() -> f64 {
    6.0
}
fn default_screenshot_patterns() -> Vec<String> {
    vec![
        "Screenshot*".to_string(),
        "Screen Shot*".to_string(),
        "Screen_Shot*".to_string(),
    ]
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            blur_threshold: default_blur_threshold(),
            darkness_threshold: default_darkness_threshold(),
            fingerprint_distance: default_fingerprint_distance(),
            screenshot_age_months: default_screenshot_age_months(),
            screenshot_patterns: default_screenshot_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between remote deletion batches.
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_batch_size() -> usize {
    10
}
fn default_batch_delay_secs() -> u64 {
    2
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the local mirror. Media lands under `YYYY/MM/`, trash under
    /// `trash/`, and the index/progress documents at the top level.
    #[serde(default)]
    pub mirror_root: Option<PathBuf>,

    /// rclone path of the remote library, e.g. `photos:media`.
    #[serde(default)]
    pub remote: Option<String>,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub analyze: AnalyzeConfig,

    #[serde(default)]
    pub delete: DeleteConfig,

    #[serde(default = "default_rules")]
    pub rules: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror_root: None,
            remote: None,
            sync: SyncConfig::default(),
            analyze: AnalyzeConfig::default(),
            delete: DeleteConfig::default(),
            rules: default_rules(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, `MIRA_CONFIG`, or the XDG
    /// config file, in that order. A missing file yields defaults.
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let path = if let Some(path) = path_override {
            Some(path)
        } else if let Ok(env_path) = std::env::var("MIRA_CONFIG") {
            Some(PathBuf::from(env_path))
        } else {
            BaseDirectories::with_prefix("mira")
                .ok()
                .and_then(|xdg| xdg.find_config_file("mira.toml"))
        };

        let config = match path {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| MiraError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| MiraError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let nonzero = |value: u64, field: &str| {
            if value == 0 {
                Err(MiraError::Config(format!("{} must be greater than zero", field)))
            } else {
                Ok(())
            }
        };

        nonzero(self.sync.cycle_threshold_full as u64, "sync.cycle_threshold_full")?;
        nonzero(self.sync.cycle_threshold_windowed as u64, "sync.cycle_threshold_windowed")?;
        nonzero(self.sync.checkpoint_interval, "sync.checkpoint_interval")?;
        nonzero(self.sync.retry_attempts as u64, "sync.retry_attempts")?;
        nonzero(self.delete.batch_size as u64, "delete.batch_size")?;

        if self.analyze.blur_threshold <= 0.0 {
            return Err(MiraError::Config(
                "analyze.blur_threshold must be positive".to_string(),
            ));
        }
        if self.analyze.screenshot_age_months <= 0.0 {
            return Err(MiraError::Config(
                "analyze.screenshot_age_months must be positive".to_string(),
            ));
        }

        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }

    /// Mirror root, defaulting to the XDG data directory.
    pub fn mirror_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.mirror_root {
            return Ok(root.clone());
        }

        let xdg = BaseDirectories::with_prefix("mira")
            .map_err(|e| MiraError::Config(format!("failed to initialize XDG directories: {}", e)))?;
        Ok(xdg.get_data_home().join("library"))
    }

    pub fn index_path(&self) -> Result<PathBuf> {
        Ok(self.mirror_root()?.join("index.json"))
    }

    pub fn sync_progress_path(&self) -> Result<PathBuf> {
        Ok(self.mirror_root()?.join("sync_progress.json"))
    }

    pub fn delete_progress_path(&self) -> Result<PathBuf> {
        Ok(self.mirror_root()?.join("delete_progress.json"))
    }

    pub fn report_path(&self) -> Result<PathBuf> {
        Ok(self.mirror_root()?.join("quality_report.json"))
    }
}
