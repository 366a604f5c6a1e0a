use crate::cli::Context;
use chrono::Utc;
use console::style;
use dialoguer::Confirm;
use mira_lib::util::format::{format_bytes, format_date};
use mira_lib::{
    evaluate, CancelToken, DeletionExecutor, DeletionPlan, ExecutorState, LibraryIndex,
    ProgressStore, Result, Trash,
};

pub fn handle_clean_command(
    ctx: &Context,
    dry_run: bool,
    yes: bool,
    remote_override: Option<String>,
) -> Result<()> {
    let index_path = ctx.config.index_path()?;
    let mut index = LibraryIndex::load(&index_path)?;

    println!("{}", style("Evaluating deletion rules").bold().cyan());
    println!(
        "Index: {} items, built {}\n",
        index.item_count,
        format_date(&index.created_at)
    );

    let report = evaluate(&index, &ctx.config.rules, Utc::now());

    if report.is_empty() {
        println!("{}", style("No items match the deletion rules").green());
        return Ok(());
    }

    println!("Matched {} items ({})", report.len(), format_bytes(report.total_bytes()));
    println!("\nSample (first 10):");
    for (idx, candidate) in report.candidates.iter().take(10).enumerate() {
        let entry = index.get(&candidate.identity);
        let date = entry
            .and_then(|e| e.resolved_date())
            .map(|d| format_date(&d))
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  {}. {} - {} ({}) - {}",
            idx + 1,
            candidate.identity,
            format_bytes(candidate.size_bytes),
            date,
            candidate.reason
        );
    }
    if report.len() > 10 {
        println!("  ... and {} more", report.len() - 10);
    }

    if dry_run {
        println!("\n{}", style("Dry run; nothing deleted").yellow());
        return Ok(());
    }

    let mut remote = ctx.open_remote(remote_override)?;
    let mut trash = Trash::open(&ctx.mirror_root)?;
    let progress = ProgressStore::new(ctx.config.delete_progress_path()?);

    let plan = DeletionPlan {
        stage_local: Vec::new(),
        delete_remote: report.candidates,
    };

    let mut executor = DeletionExecutor::new(
        &mut remote,
        &mut index,
        index_path,
        &mut trash,
        &progress,
        &ctx.config.delete,
        CancelToken::for_sigint(),
    );

    let outcome = executor.execute(&plan, |plan| {
        println!(
            "\n{}",
            style("WARNING: this will DELETE items from the remote library!").red().bold()
        );
        println!(
            "{} items, {} total. Local mirror copies are kept.",
            plan.delete_remote.len(),
            format_bytes(plan.remote_bytes())
        );
        if yes {
            return true;
        }
        Confirm::new()
            .with_prompt("Are you sure you want to continue?")
            .default(false)
            .interact()
            .unwrap_or(false)
    })?;

    println!();
    match outcome.state {
        ExecutorState::Completed => println!("{}", style("Deletion complete").bold().green()),
        ExecutorState::Aborted => {
            println!("{}", style("Deletion stopped; progress saved").yellow());
            println!("Run again to resume the remaining candidates.");
        }
        _ => {}
    }
    println!("Deleted: {}", outcome.deleted);
    println!("Failed:  {}", outcome.failed);
    println!("Skipped: {}", outcome.skipped);
    println!("Freed:   {}", format_bytes(outcome.freed_bytes));

    Ok(())
}
