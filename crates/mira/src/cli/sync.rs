use crate::cli::Context;
use console::style;
use mira_lib::{
    CancelToken, LibraryIndex, ProgressStore, Result, SyncEngine, SyncOptions, Termination,
};
use mira_lib::util::format::format_bytes;

pub fn handle_sync_command(
    ctx: &Context,
    window: Option<u32>,
    remote_override: Option<String>,
) -> Result<()> {
    let mut remote = ctx.open_remote(remote_override)?;

    let index_path = ctx.config.index_path()?;
    let mut index = LibraryIndex::load_or_default(&index_path)?;
    let progress = ProgressStore::new(ctx.config.sync_progress_path()?);
    let cancel = CancelToken::for_sigint();

    println!("{}", style("Syncing remote library").bold().cyan());
    if let Some(days) = window {
        println!("Window: items from the last {} days", days);
    }
    println!("Mirror: {}\n", ctx.mirror_root.display());

    let mut engine = SyncEngine::new(
        &mut remote,
        &mut index,
        index_path,
        &progress,
        ctx.mirror_root.clone(),
        ctx.config.sync.clone(),
        cancel,
    );

    let report = engine.run(&SyncOptions { window_days: window })?;

    println!();
    match report.termination {
        Termination::Interrupted => {
            println!("{}", style("Sync interrupted; progress saved").yellow());
            println!("Run again to resume.");
        }
        other => {
            println!("{} ({})", style("Sync complete").bold().green(), other.as_str());
        }
    }
    println!("Downloaded: {}", report.downloaded);
    println!("Skipped:    {}", report.skipped);
    println!("Failed:     {}", report.failed);
    println!("Fetched:    {}", format_bytes(report.bytes_fetched));
    println!("Indexed:    {} items", report.indexed_items);

    Ok(())
}
