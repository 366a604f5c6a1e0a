//! Staged, resumable deletion.
//!
//! The executor walks `Idle -> Confirming -> Deleting -> Completed |
//! Aborted`. One confirmation capability is invoked before anything
//! destructive; after that, candidates are processed in fixed-size batches
//! with a checkpoint between batches, bounding loss on crash to one
//! in-flight batch. A candidate whose entry is already gone from the index
//! is skipped, which is what makes re-runs at-most-once per item.
//!
//! Two kinds of work flow through: quality suspects are *staged* into the
//! local trash (recoverable, remote untouched), and criteria candidates
//! are deleted from the remote (index entry removed only after the
//! adapter acknowledges).

use crate::config::DeleteConfig;
use crate::criteria::DeletionCandidate;
use crate::error::{MiraError, Result};
use crate::remote::{with_retry, RemoteLibrary};
use crate::store::index::LibraryIndex;
use crate::store::progress::ProgressStore;
use crate::store::trash::Trash;
use crate::util::interrupt::CancelToken;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Confirming,
    Deleting,
    Completed,
    Aborted,
}

/// Everything the executor has been asked to do, shown to the
/// confirmation gate before any of it happens.
#[derive(Debug, Clone, Default)]
pub struct DeletionPlan {
    /// Move these into the local trash; the remote copy stays.
    pub stage_local: Vec<DeletionCandidate>,
    /// Delete these from the remote store.
    pub delete_remote: Vec<DeletionCandidate>,
}

impl DeletionPlan {
    pub fn is_empty(&self) -> bool {
        self.stage_local.is_empty() && self.delete_remote.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stage_local.len() + self.delete_remote.len()
    }

    pub fn remote_bytes(&self) -> u64 {
        self.delete_remote.iter().map(|c| c.size_bytes).sum()
    }
}

#[derive(Debug, Clone)]
pub struct DeletionReport {
    pub staged: u64,
    pub deleted: u64,
    pub failed: u64,
    pub skipped: u64,
    pub freed_bytes: u64,
    pub state: ExecutorState,
}

pub struct DeletionExecutor<'a, R: RemoteLibrary> {
    remote: &'a mut R,
    index: &'a mut LibraryIndex,
    index_path: PathBuf,
    trash: &'a mut Trash,
    progress: &'a ProgressStore,
    config: &'a DeleteConfig,
    cancel: CancelToken,
    state: ExecutorState,
}

impl<'a, R: RemoteLibrary> DeletionExecutor<'a, R> {
    pub fn new(
        remote: &'a mut R,
        index: &'a mut LibraryIndex,
        index_path: PathBuf,
        trash: &'a mut Trash,
        progress: &'a ProgressStore,
        config: &'a DeleteConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            remote,
            index,
            index_path,
            trash,
            progress,
            config,
            cancel,
            state: ExecutorState::Idle,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Run the plan to a terminal state. `confirm` is the single gate
    /// between looking and touching; how it decides (interactive prompt,
    /// `--yes` flag) is the caller's concern.
    pub fn execute<F>(&mut self, plan: &DeletionPlan, confirm: F) -> Result<DeletionReport>
    where
        F: FnOnce(&DeletionPlan) -> bool,
    {
        let mut report = DeletionReport {
            staged: 0,
            deleted: 0,
            failed: 0,
            skipped: 0,
            freed_bytes: 0,
            state: ExecutorState::Idle,
        };

        if plan.is_empty() {
            self.state = ExecutorState::Completed;
            report.state = self.state;
            return Ok(report);
        }

        self.state = ExecutorState::Confirming;
        if !confirm(plan) {
            log::info!("deletion cancelled at confirmation gate");
            self.state = ExecutorState::Aborted;
            report.state = self.state;
            return Ok(report);
        }

        self.state = ExecutorState::Deleting;
        let mut progress_state = self.progress.load()?;

        let interrupted = self.stage_local(plan, &mut report)?;
        self.checkpoint(&mut progress_state)?;

        if interrupted {
            self.state = ExecutorState::Aborted;
            report.state = self.state;
            return Ok(report);
        }

        let outcome = self.delete_remote(plan, &mut report, &mut progress_state);
        self.checkpoint(&mut progress_state)?;

        match outcome {
            Ok(false) => self.state = ExecutorState::Completed,
            Ok(true) => self.state = ExecutorState::Aborted,
            Err(e) => {
                self.state = ExecutorState::Aborted;
                return Err(e);
            }
        }
        report.state = self.state;

        log::info!(
            "deletion finished ({:?}): {} staged, {} deleted, {} failed, {} skipped",
            self.state,
            report.staged,
            report.deleted,
            report.failed,
            report.skipped
        );

        Ok(report)
    }

    /// Move quality suspects into the local trash. The index entry keeps
    /// tracking the file at its trash location so a later sync does not
    /// re-fetch it. Returns true when interrupted.
    fn stage_local(&mut self, plan: &DeletionPlan, report: &mut DeletionReport) -> Result<bool> {
        for candidate in &plan.stage_local {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }

            let Some(entry) = self.index.get(&candidate.identity) else {
                report.skipped += 1;
                continue;
            };
            let Some(relative) = entry.local_path.clone() else {
                report.skipped += 1;
                continue;
            };

            match self.trash.stage(&relative, Some(&candidate.identity)) {
                Ok(record) => {
                    if let Some(entry) = self.index.entries.get_mut(&candidate.identity) {
                        entry.local_path =
                            Some(PathBuf::from("trash").join(&record.trashed_path));
                    }
                    report.staged += 1;
                    log::info!("staged to trash: {} ({})", candidate.identity, candidate.reason);
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!("failed to stage {}: {}", candidate.identity, e);
                }
            }
        }

        Ok(false)
    }

    /// Returns true when interrupted.
    fn delete_remote(
        &mut self,
        plan: &DeletionPlan,
        report: &mut DeletionReport,
        progress_state: &mut crate::store::progress::ProgressState,
    ) -> Result<bool> {
        let attempts = self.config.retry_attempts;
        let delay = Duration::from_secs(self.config.retry_delay_secs);
        let batches: Vec<&[DeletionCandidate]> =
            plan.delete_remote.chunks(self.config.batch_size).collect();
        let batch_count = batches.len();

        for (batch_no, batch) in batches.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("deletion interrupted before batch {}", batch_no + 1);
                return Ok(true);
            }

            for candidate in batch {
                // Already gone from the index: deleted by a previous run.
                let Some(entry) = self.index.get(&candidate.identity) else {
                    report.skipped += 1;
                    continue;
                };
                let remote_identity = entry.remote_identity().to_string();

                let remote = &mut *self.remote;
                match with_retry(attempts, delay, || remote.delete(&remote_identity)) {
                    Ok(()) => {
                        self.index.remove(&candidate.identity);
                        self.trash.remove_by_identity(&candidate.identity)?;
                        report.deleted += 1;
                        report.freed_bytes += candidate.size_bytes;
                        progress_state.stats.deleted += 1;
                        log::info!(
                            "deleted from remote ({}): {} - {}",
                            report.deleted,
                            candidate.identity,
                            candidate.reason
                        );
                    }
                    Err(e) if e.is_fatal() => {
                        return Err(MiraError::Remote(e));
                    }
                    Err(e) => {
                        report.failed += 1;
                        progress_state.stats.failed += 1;
                        log::warn!("failed to delete {}: {}", candidate.identity, e);
                    }
                }
            }

            // Checkpoint before the next batch starts: a crash now loses
            // at most the batch in flight.
            self.checkpoint(progress_state)?;

            if batch_no + 1 < batch_count && self.config.batch_delay_secs > 0 {
                std::thread::sleep(Duration::from_secs(self.config.batch_delay_secs));
            }
        }

        Ok(false)
    }

    fn checkpoint(
        &mut self,
        progress_state: &mut crate::store::progress::ProgressState,
    ) -> Result<()> {
        self.index.save(&self.index_path)?;
        self.progress.save(progress_state)
    }
}
