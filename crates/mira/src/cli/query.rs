use crate::cli::Context;
use chrono::Utc;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use mira_lib::dates::age_years;
use mira_lib::util::format::{format_bytes, format_timestamp};
use mira_lib::{IndexEntry, LibraryIndex, Result};
use std::collections::BTreeMap;

#[derive(Subcommand)]
pub enum QueryCommands {
    #[command(about = "Show index statistics")]
    Stats,

    #[command(about = "Search entries by filename")]
    Search {
        #[arg(help = "Substring to search for")]
        term: String,
    },

    #[command(about = "Show item counts and sizes by year")]
    Years,

    #[command(about = "Show the largest items")]
    Largest {
        #[arg(help = "Number of items to show", default_value = "20")]
        limit: usize,
    },

    #[command(about = "Show videos grouped by age")]
    Videos,
}

pub fn handle_query_command(ctx: &Context, action: QueryCommands) -> Result<()> {
    let index = LibraryIndex::load(&ctx.config.index_path()?)?;

    match action {
        QueryCommands::Stats => query_stats(&index),
        QueryCommands::Search { term } => query_search(&index, &term),
        QueryCommands::Years => query_years(&index),
        QueryCommands::Largest { limit } => query_largest(&index, limit),
        QueryCommands::Videos => query_videos(&index),
    }
}

fn query_stats(index: &LibraryIndex) -> Result<()> {
    let stats = index.stats();

    println!("\n{}\n", style("Library Index").bold().cyan());
    println!("Created: {}", format_timestamp(&index.created_at));
    println!("Updated: {}", format_timestamp(&index.updated_at));
    println!();
    println!("Total items: {}", stats.total_items);
    println!("  Photos:     {}", stats.photos);
    println!("  Videos:     {}", stats.videos);
    println!("  Downloaded: {}", stats.downloaded);
    println!("  Total size: {}", format_bytes(stats.total_bytes));

    Ok(())
}

fn query_search(index: &LibraryIndex, term: &str) -> Result<()> {
    let term_lower = term.to_lowercase();
    let matches: Vec<&IndexEntry> = index
        .scan()
        .filter(|e| e.filename.to_lowercase().contains(&term_lower))
        .collect();

    if matches.is_empty() {
        println!("{}", style(format!("No entries match '{}'", term)).yellow());
        return Ok(());
    }

    println!(
        "\n{} ({} matches)\n",
        style("Search Results").bold().cyan(),
        matches.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Filename").fg(Color::Cyan),
        Cell::new("Kind").fg(Color::Cyan),
        Cell::new("Size").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Mirrored").fg(Color::Cyan),
    ]);

    for entry in matches.iter().take(20) {
        table.add_row(vec![
            entry.filename.clone(),
            entry.kind.as_str().to_string(),
            format_bytes(entry.size_bytes),
            entry
                .resolved_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            if entry.local_path.is_some() { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");

    if matches.len() > 20 {
        println!("... and {} more", matches.len() - 20);
    }

    Ok(())
}

fn query_years(index: &LibraryIndex) -> Result<()> {
    let mut by_year: BTreeMap<String, (usize, u64)> = BTreeMap::new();

    for entry in index.scan() {
        let year = entry
            .resolved_date()
            .map(|d| d.format("%Y").to_string())
            .unwrap_or_else(|| "undated".to_string());
        let slot = by_year.entry(year).or_default();
        slot.0 += 1;
        slot.1 += entry.size_bytes;
    }

    println!("\n{}\n", style("Items by Year").bold().cyan());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Year").fg(Color::Cyan),
        Cell::new("Items").fg(Color::Cyan),
        Cell::new("Size").fg(Color::Cyan),
    ]);

    for (year, (count, bytes)) in by_year.iter().rev() {
        table.add_row(vec![year.clone(), count.to_string(), format_bytes(*bytes)]);
    }
    println!("{table}");

    Ok(())
}

fn query_largest(index: &LibraryIndex, limit: usize) -> Result<()> {
    let mut entries: Vec<&IndexEntry> = index.scan().collect();
    entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

    println!("\n{} (top {})\n", style("Largest Items").bold().cyan(), limit);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Filename").fg(Color::Cyan),
        Cell::new("Size").fg(Color::Cyan),
        Cell::new("Kind").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
    ]);

    for (idx, entry) in entries.iter().take(limit).enumerate() {
        table.add_row(vec![
            (idx + 1).to_string(),
            entry.filename.clone(),
            format_bytes(entry.size_bytes),
            entry.kind.as_str().to_string(),
            entry
                .resolved_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn query_videos(index: &LibraryIndex) -> Result<()> {
    let now = Utc::now();
    let mut groups: BTreeMap<&str, (usize, u64)> = BTreeMap::new();

    let videos: Vec<&IndexEntry> = index.scan().filter(|e| e.is_video()).collect();
    if videos.is_empty() {
        println!("{}", style("No videos in the index").yellow());
        return Ok(());
    }

    for entry in &videos {
        let bucket = match entry.resolved_date().and_then(|d| age_years(d, now)) {
            Some(age) if age >= 2.0 => "> 2 years",
            Some(age) if age >= 1.0 => "1-2 years",
            Some(_) => "< 1 year",
            None => "undated",
        };
        let slot = groups.entry(bucket).or_default();
        slot.0 += 1;
        slot.1 += entry.size_bytes;
    }

    println!(
        "\n{} ({} total)\n",
        style("Videos by Age").bold().cyan(),
        videos.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Age").fg(Color::Cyan),
        Cell::new("Videos").fg(Color::Cyan),
        Cell::new("Size").fg(Color::Cyan),
    ]);

    for bucket in ["< 1 year", "1-2 years", "> 2 years", "undated"] {
        if let Some((count, bytes)) = groups.get(bucket) {
            table.add_row(vec![
                bucket.to_string(),
                count.to_string(),
                format_bytes(*bytes),
            ]);
        }
    }
    println!("{table}");

    Ok(())
}
