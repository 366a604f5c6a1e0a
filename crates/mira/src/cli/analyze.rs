use crate::cli::Context;
use chrono::Utc;
use console::style;
use dialoguer::Confirm;
use mira_lib::analyze::staging_candidates;
use mira_lib::util::progress::create_spinner;
use mira_lib::{
    CancelToken, DeletionExecutor, DeletionPlan, LibraryIndex, ProgressStore, QualityAnalyzer,
    RcloneRemote, Result, Trash,
};

pub fn handle_analyze_command(ctx: &Context, stage: bool, yes: bool) -> Result<()> {
    let index_path = ctx.config.index_path()?;
    let mut index = LibraryIndex::load(&index_path)?;

    println!("{}", style("Analyzing mirrored photos").bold().cyan());
    println!("Mirror: {}\n", ctx.mirror_root.display());

    let analyzer = QualityAnalyzer::new(&ctx.config.analyze, ctx.mirror_root.clone())?;
    let spinner = create_spinner("Analyzing photos");
    let result = analyzer.analyze(&mut index, Utc::now());
    spinner.finish_and_clear();
    let report = result?;

    // Fingerprints computed during analysis are cached in the index.
    index.save(&index_path)?;

    let report_path = ctx.config.report_path()?;
    report.save(&report_path)?;

    println!("Photos scanned:     {}", report.scanned);
    println!(
        "Duplicate groups:   {} ({} redundant images)",
        report.duplicate_groups.len(),
        report.duplicate_count()
    );
    println!("Blurry images:      {}", report.blurry.len());
    println!("Dark images:        {}", report.dark.len());
    println!("Stale screenshots:  {}", report.stale_screenshots.len());
    println!("Errors:             {}", report.errors.len());
    println!("\nReport saved to {}", report_path.display());

    if !stage {
        if report.has_suspects() {
            println!("\nRun `mira analyze --stage` to move suspects into the local trash.");
        }
        return Ok(());
    }

    let candidates = staging_candidates(&report, &index);
    if candidates.is_empty() {
        println!("\n{}", style("Nothing to stage").green());
        return Ok(());
    }

    let plan = DeletionPlan {
        stage_local: candidates,
        delete_remote: Vec::new(),
    };

    // Staging only touches local files; the remote is never contacted.
    let mut remote = RcloneRemote::new(ctx.config.remote.clone().unwrap_or_default());
    let mut trash = Trash::open(&ctx.mirror_root)?;
    let progress = ProgressStore::new(ctx.config.delete_progress_path()?);

    let mut executor = DeletionExecutor::new(
        &mut remote,
        &mut index,
        index_path,
        &mut trash,
        &progress,
        &ctx.config.delete,
        CancelToken::for_sigint(),
    );

    let report = executor.execute(&plan, |plan| {
        println!(
            "\n{} images will move to the local trash (recoverable with `mira trash restore`).",
            plan.stage_local.len()
        );
        if yes {
            return true;
        }
        Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()
            .unwrap_or(false)
    })?;

    println!();
    println!("Staged:  {}", report.staged);
    println!("Failed:  {}", report.failed);
    println!("Skipped: {}", report.skipped);

    Ok(())
}
