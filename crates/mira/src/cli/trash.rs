use crate::cli::Context;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use dialoguer::Confirm;
use mira_lib::util::format::format_timestamp;
use mira_lib::{LibraryIndex, Result, Trash};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum TrashCommands {
    #[command(about = "List trashed files")]
    List,

    #[command(about = "Restore a trashed file to its original location")]
    Restore {
        #[arg(help = "Original relative path of the file")]
        path: PathBuf,
    },

    #[command(about = "Permanently delete everything in the trash")]
    Purge {
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_trash_command(ctx: &Context, action: TrashCommands) -> Result<()> {
    let mut trash = Trash::open(&ctx.mirror_root)?;

    match action {
        TrashCommands::List => {
            if trash.is_empty() {
                println!("{}", style("Trash is empty").green());
                return Ok(());
            }

            println!(
                "\n{} ({} files)\n",
                style("Trash").bold().cyan(),
                trash.records().len()
            );

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("Original Path").fg(Color::Cyan),
                Cell::new("Trashed At").fg(Color::Cyan),
            ]);
            for record in trash.records() {
                table.add_row(vec![
                    record.original_path.display().to_string(),
                    format_timestamp(&record.trashed_at),
                ]);
            }
            println!("{table}");

            Ok(())
        }

        TrashCommands::Restore { path } => {
            let record = trash.restore(&path)?;

            // Point the index back at the restored location.
            if let Some(identity) = &record.identity {
                let index_path = ctx.config.index_path()?;
                if let Ok(mut index) = LibraryIndex::load(&index_path) {
                    if let Some(entry) = index.entries.get_mut(identity) {
                        entry.local_path = Some(record.original_path.clone());
                        index.save(&index_path)?;
                    }
                }
            }

            println!(
                "{} {}",
                style("Restored").bold().green(),
                record.original_path.display()
            );
            Ok(())
        }

        TrashCommands::Purge { yes } => {
            if trash.is_empty() {
                println!("{}", style("Trash is empty").green());
                return Ok(());
            }

            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!(
                        "Permanently delete {} trashed files?",
                        trash.records().len()
                    ))
                    .default(false)
                    .interact()?;

            if !confirmed {
                println!("{}", style("Purge cancelled").yellow());
                return Ok(());
            }

            let purged = trash.purge()?;
            println!("{} {} files", style("Purged").bold().green(), purged);
            Ok(())
        }
    }
}
