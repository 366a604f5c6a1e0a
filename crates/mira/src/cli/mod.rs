pub mod analyze;
pub mod clean;
pub mod query;
pub mod rebuild;
pub mod refresh;
pub mod sync;
pub mod trash;

use clap::{Parser, Subcommand};
use mira_lib::{Config, MiraError, RcloneRemote, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mira")]
#[command(about = "Resumable mirroring and rule-driven pruning for remote photo libraries", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mirror new remote items into the local library")]
    Sync {
        #[arg(long, help = "Only consider items newer than this many days")]
        window: Option<u32>,

        #[arg(long, help = "Override the configured rclone remote")]
        remote: Option<String>,
    },

    #[command(about = "Analyze mirrored photos for duplicates and low quality")]
    Analyze {
        #[arg(long, help = "Move suspect images into the local trash")]
        stage: bool,

        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Evaluate deletion rules and prune the remote library")]
    Clean {
        #[arg(long, help = "Report candidates without deleting anything")]
        dry_run: bool,

        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,

        #[arg(long, help = "Override the configured rclone remote")]
        remote: Option<String>,
    },

    #[command(about = "Query the index")]
    Query {
        #[command(subcommand)]
        action: query::QueryCommands,
    },

    #[command(about = "Rebuild the index from the local mirror")]
    Rebuild,

    #[command(about = "Fill missing index metadata from the remote without downloading")]
    RefreshMetadata {
        #[arg(long, help = "Override the configured rclone remote")]
        remote: Option<String>,
    },

    #[command(about = "Manage the local trash")]
    Trash {
        #[command(subcommand)]
        action: trash::TrashCommands,
    },
}

pub struct Context {
    pub config: Config,
    pub mirror_root: PathBuf,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Config::load(config_path)?;
        let mirror_root = config.mirror_root()?;
        std::fs::create_dir_all(&mirror_root)?;

        Ok(Self { config, mirror_root })
    }

    /// The rclone remote to talk to, from the flag or the config file.
    pub fn open_remote(&self, remote_override: Option<String>) -> Result<RcloneRemote> {
        let remote = remote_override
            .or_else(|| self.config.remote.clone())
            .ok_or_else(|| {
                MiraError::Config(
                    "no remote configured; set `remote` in mira.toml or pass --remote".to_string(),
                )
            })?;

        if !RcloneRemote::is_available() {
            return Err(MiraError::Config(
                "rclone not found on PATH; install it or check your environment".to_string(),
            ));
        }

        Ok(RcloneRemote::new(remote))
    }
}
