use crate::cli::Context;
use console::style;
use mira_lib::util::progress::create_spinner;
use mira_lib::{rebuild_index, Result};

pub fn handle_rebuild_command(ctx: &Context) -> Result<()> {
    println!("{}", style("Rebuilding index from local mirror").bold().cyan());
    println!("Scanning: {}\n", ctx.mirror_root.display());

    let spinner = create_spinner("Walking mirror tree");
    let result = rebuild_index(&ctx.mirror_root);
    spinner.finish_and_clear();
    let (mut index, stats) = result?;

    let index_path = ctx.config.index_path()?;
    index.save(&index_path)?;

    println!("{}", style("Rebuild complete").bold().green());
    println!("Indexed: {} items ({} photos, {} videos)", stats.files_indexed, stats.photos, stats.videos);
    println!("Skipped: {} non-media files", stats.skipped);
    if stats.errors > 0 {
        println!("Errors:  {}", stats.errors);
    }
    println!("\nIndex written to {}", index_path.display());
    println!("Dates come from the filesystem; run `mira refresh-metadata` to fill in remote metadata.");

    Ok(())
}
