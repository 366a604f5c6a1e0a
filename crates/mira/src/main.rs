mod cli;

use clap::Parser;
use mira_lib::Result;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "info" } else { "warn" },
    ))
    .init();

    let ctx = cli::Context::load(cli.config.clone())?;

    match cli.command {
        cli::Commands::Sync { window, remote } => {
            cli::sync::handle_sync_command(&ctx, window, remote)
        }

        cli::Commands::Analyze { stage, yes } => {
            cli::analyze::handle_analyze_command(&ctx, stage, yes)
        }

        cli::Commands::Clean { dry_run, yes, remote } => {
            cli::clean::handle_clean_command(&ctx, dry_run, yes, remote)
        }

        cli::Commands::Query { action } => {
            cli::query::handle_query_command(&ctx, action)
        }

        cli::Commands::Rebuild => {
            cli::rebuild::handle_rebuild_command(&ctx)
        }

        cli::Commands::RefreshMetadata { remote } => {
            cli::refresh::handle_refresh_command(&ctx, remote)
        }

        cli::Commands::Trash { action } => {
            cli::trash::handle_trash_command(&ctx, action)
        }
    }
}
