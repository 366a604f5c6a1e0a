use crate::cli::Context;
use console::style;
use mira_lib::sync::refresh::entries_missing_metadata;
use mira_lib::{refresh_metadata, CancelToken, LibraryIndex, Result};

pub fn handle_refresh_command(ctx: &Context, remote_override: Option<String>) -> Result<()> {
    let index_path = ctx.config.index_path()?;
    let mut index = LibraryIndex::load(&index_path)?;

    let missing = entries_missing_metadata(&index);
    if missing == 0 {
        println!("{}", style("All entries already have remote metadata").green());
        return Ok(());
    }

    println!("{}", style("Refreshing index metadata").bold().cyan());
    println!("{} entries are missing remote metadata\n", missing);

    let mut remote = ctx.open_remote(remote_override)?;
    let cancel = CancelToken::for_sigint();

    let report = refresh_metadata(
        &mut remote,
        &mut index,
        index_path,
        &ctx.config.sync,
        &cancel,
    )?;

    println!("{} ({})", style("Refresh finished").bold().green(), report.termination.as_str());
    println!("Checked:   {} remote items", report.checked);
    println!("Updated:   {} entries", report.updated);
    println!("Remaining: {} entries without metadata", report.remaining);

    Ok(())
}
