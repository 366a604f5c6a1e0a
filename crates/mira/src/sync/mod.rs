//! Incremental synchronization of the remote library into the local mirror.
//!
//! The remote enumerates in an unstable order with no end-of-collection
//! signal and may repeat items, so completion is inferred: a long unbroken
//! run of already-seen items means the remainder of the enumeration is
//! exhausted. That is a heuristic, not a proof; the report says which way
//! a run ended so callers can tell heuristic termination from a genuinely
//! drained enumeration.
//!
//! Progress is checkpointed every `checkpoint_interval` items and on every
//! termination path, so an interrupted run resumes at the last saved
//! cursor instead of starting over.

pub mod refresh;

use crate::config::SyncConfig;
use crate::dates::resolve_date;
use crate::error::{MiraError, Result};
use crate::remote::{with_retry, RemoteError, RemoteItem, RemoteLibrary};
use crate::store::index::{IndexEntry, LibraryIndex};
use crate::store::progress::ProgressStore;
use crate::util::interrupt::CancelToken;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Only consider items newer than this many days; the run stops at the
    /// first older item on the assumption that enumeration is roughly
    /// recency-ordered. Completeness requires an occasional full run.
    pub window_days: Option<u32>,
}

impl SyncOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(days) = self.window_days {
            if days == 0 {
                return Err(MiraError::Config(
                    "sync window must be greater than zero days".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// How a run ended. `CyclingDetected` is the repeat-count heuristic;
/// `Exhausted` means the adapter's enumeration actually drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exhausted,
    CyclingDetected,
    WindowReached,
    Interrupted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Exhausted => "enumeration exhausted",
            Termination::CyclingDetected => "cycling detected",
            Termination::WindowReached => "window reached",
            Termination::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_fetched: u64,
    pub indexed_items: usize,
    pub termination: Termination,
}

pub struct SyncEngine<'a, R: RemoteLibrary> {
    remote: &'a mut R,
    index: &'a mut LibraryIndex,
    index_path: PathBuf,
    progress: &'a ProgressStore,
    mirror_root: PathBuf,
    config: SyncConfig,
    cancel: CancelToken,
}

impl<'a, R: RemoteLibrary> SyncEngine<'a, R> {
    pub fn new(
        remote: &'a mut R,
        index: &'a mut LibraryIndex,
        index_path: PathBuf,
        progress: &'a ProgressStore,
        mirror_root: PathBuf,
        config: SyncConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            remote,
            index,
            index_path,
            progress,
            mirror_root,
            config,
            cancel,
        }
    }

    /// Drive one sync run to a terminal state. Counters include progress
    /// restored from an interrupted run of the same operation.
    pub fn run(&mut self, options: &SyncOptions) -> Result<SyncReport> {
        options.validate()?;

        let mut state = self.progress.load()?;
        if !state.has_prior_progress() {
            // Fresh run (or a completed one): counters describe this run.
            state.stats = crate::store::progress::RunStats::default();
            state.consecutive_repeats = 0;
        } else {
            log::info!(
                "resuming sync at cursor {} ({} downloaded, {} skipped, {} failed so far)",
                state.cursor,
                state.stats.downloaded,
                state.stats.skipped,
                state.stats.failed
            );
        }

        let cutoff = options
            .window_days
            .map(|days| Utc::now() - Duration::days(days as i64));
        let cycle_threshold = if cutoff.is_some() {
            self.config.cycle_threshold_windowed
        } else {
            self.config.cycle_threshold_full
        };

        let resume_cursor = state.cursor;
        let mut position: u64 = 0;
        let mut processed: u64 = 0;
        let mut bytes_fetched: u64 = 0;
        let mut termination = Termination::Exhausted;
        let mut fatal: Option<RemoteError> = None;

        let mut items = self.remote.items()?;

        loop {
            if self.cancel.is_cancelled() {
                termination = Termination::Interrupted;
                break;
            }

            let Some(next) = items.next() else { break };
            position += 1;

            // Items before the resume point were handled by the
            // interrupted run.
            if position <= resume_cursor {
                continue;
            }

            let item = match next {
                Ok(item) => item,
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    termination = Termination::Interrupted;
                    break;
                }
                Err(e) => {
                    log::warn!("enumeration error at position {}: {}", position, e);
                    state.stats.failed += 1;
                    continue;
                }
            };

            if let Some(cutoff) = cutoff {
                let item_date = resolve_date(item.added_date, item.asset_date, item.created_date);
                if let Some(date) = item_date {
                    if date < cutoff {
                        log::info!(
                            "reached window boundary at position {}: {} is older than cutoff",
                            position,
                            item.filename
                        );
                        termination = Termination::WindowReached;
                        break;
                    }
                }
            }

            let already_mirrored = self
                .index
                .key_for_item(&item)
                .and_then(|key| self.index.get(&key))
                .and_then(|entry| entry.local_path.as_ref())
                .map(|rel| file_exists_and_valid(&self.mirror_root.join(rel)))
                .unwrap_or(false);

            if already_mirrored {
                state.stats.skipped += 1;
                state.consecutive_repeats += 1;
                if state.consecutive_repeats >= cycle_threshold {
                    log::info!(
                        "cycling detected after {} consecutive already-seen items",
                        state.consecutive_repeats
                    );
                    termination = Termination::CyclingDetected;
                    state.cursor = position;
                    break;
                }
            } else {
                state.consecutive_repeats = 0;
                match self.mirror_item(&item) {
                    Ok(MirrorOutcome::Fetched(bytes)) => {
                        state.stats.downloaded += 1;
                        bytes_fetched += bytes;
                        log::info!(
                            "[{}] downloaded {} ({} so far)",
                            position,
                            item.filename,
                            state.stats.downloaded
                        );
                    }
                    Ok(MirrorOutcome::AlreadyOnDisk) => {
                        state.stats.skipped += 1;
                    }
                    Err(MiraError::Remote(e)) if e.is_fatal() => {
                        fatal = Some(e);
                        termination = Termination::Interrupted;
                        state.cursor = position.saturating_sub(1);
                        break;
                    }
                    Err(e) => {
                        state.stats.failed += 1;
                        log::warn!("[{}] failed to mirror {}: {}", position, item.filename, e);
                    }
                }
            }

            state.cursor = position;
            processed += 1;

            if processed % self.config.checkpoint_interval == 0 {
                self.checkpoint(&mut state)?;
                log::debug!("checkpoint at position {}", position);
            }
        }

        // Terminal checkpoint, on every path. A completed run rewinds the
        // cursor so the next invocation enumerates from the start; an
        // interrupted one keeps it for resume.
        if !matches!(termination, Termination::Interrupted) {
            state.cursor = 0;
            state.consecutive_repeats = 0;
        }
        self.checkpoint(&mut state)?;

        if let Some(e) = fatal {
            log::error!("sync aborted: {}", e);
            return Err(MiraError::Remote(e));
        }

        let report = SyncReport {
            downloaded: state.stats.downloaded,
            skipped: state.stats.skipped,
            failed: state.stats.failed,
            bytes_fetched,
            indexed_items: self.index.stats().total_items,
            termination,
        };

        log::info!(
            "sync finished ({}): {} downloaded, {} skipped, {} failed, {} indexed",
            report.termination.as_str(),
            report.downloaded,
            report.skipped,
            report.failed,
            report.indexed_items
        );

        Ok(report)
    }

    /// Fetch one item into the mirror and upsert its index entry.
    fn mirror_item(&mut self, item: &RemoteItem) -> Result<MirrorOutcome> {
        let relative = date_derived_path(item);
        let target = self.mirror_root.join(&relative);

        let mut entry = IndexEntry::from_remote_item(item);

        if file_exists_and_valid(&target) {
            entry.local_path = Some(relative);
            self.index.upsert(entry);
            return Ok(MirrorOutcome::AlreadyOnDisk);
        }

        let attempts = self.config.retry_attempts;
        let delay = std::time::Duration::from_secs(self.config.retry_delay_secs);
        let remote = &mut *self.remote;
        let bytes = with_retry(attempts, delay, || remote.fetch(item))?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &bytes)?;

        entry.local_path = Some(relative);
        entry.content_hash = Some(blake3::hash(&bytes).to_hex().to_string());
        self.index.upsert(entry);

        Ok(MirrorOutcome::Fetched(bytes.len() as u64))
    }

    fn checkpoint(&mut self, state: &mut crate::store::progress::ProgressState) -> Result<()> {
        self.index.save(&self.index_path)?;
        self.progress.save(state)
    }
}

enum MirrorOutcome {
    Fetched(u64),
    AlreadyOnDisk,
}

/// Mirror layout: `YYYY/MM/filename` from the resolved date, `undated/`
/// when no date is available.
fn date_derived_path(item: &RemoteItem) -> PathBuf {
    let date: Option<DateTime<Utc>> =
        resolve_date(item.added_date, item.asset_date, item.created_date);
    match date {
        Some(date) => PathBuf::from(date.format("%Y/%m").to_string()).join(&item.filename),
        None => PathBuf::from("undated").join(&item.filename),
    }
}

fn file_exists_and_valid(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}
