//! Metadata refresh: fill index entries that are missing remote metadata
//! without fetching any bytes.
//!
//! Useful after `rebuild`, which only knows what the filesystem knows.
//! Enumeration is the same unordered, repeating stream as sync, so the run
//! ends by the same cycling heuristic, or early once every incomplete
//! entry has been filled.

use crate::config::SyncConfig;
use crate::error::{MiraError, Result};
use crate::remote::RemoteLibrary;
use crate::store::index::{IndexEntry, LibraryIndex};
use crate::sync::Termination;
use crate::util::interrupt::CancelToken;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub checked: u64,
    pub updated: u64,
    pub remaining: usize,
    pub termination: Termination,
}

/// Entries still waiting on remote metadata.
pub fn entries_missing_metadata(index: &LibraryIndex) -> usize {
    index.scan().filter(|e| e.asset_date.is_none()).count()
}

pub fn refresh_metadata<R: RemoteLibrary>(
    remote: &mut R,
    index: &mut LibraryIndex,
    index_path: PathBuf,
    config: &SyncConfig,
    cancel: &CancelToken,
) -> Result<RefreshReport> {
    let needs_update = entries_missing_metadata(index);
    if needs_update == 0 {
        return Ok(RefreshReport {
            checked: 0,
            updated: 0,
            remaining: 0,
            termination: Termination::Exhausted,
        });
    }

    log::info!("{} entries are missing remote metadata", needs_update);

    let mut checked: u64 = 0;
    let mut updated: u64 = 0;
    let mut consecutive_useless: u32 = 0;
    let mut termination = Termination::Exhausted;

    let mut items = remote.items()?;

    loop {
        if cancel.is_cancelled() {
            termination = Termination::Interrupted;
            break;
        }

        let Some(next) = items.next() else { break };
        checked += 1;

        let item = match next {
            Ok(item) => item,
            Err(e) if e.is_fatal() => {
                index.save(&index_path)?;
                return Err(MiraError::Remote(e));
            }
            Err(e) => {
                log::warn!("enumeration error during refresh: {}", e);
                continue;
            }
        };

        let key = index.key_for_item(&item);
        let useful = key
            .as_deref()
            .and_then(|key| index.get(key))
            .map(|entry| entry.asset_date.is_none())
            .unwrap_or(false);

        if !useful {
            consecutive_useless += 1;
            if consecutive_useless >= config.cycle_threshold_full {
                log::info!(
                    "cycling detected after {} consecutive items with nothing to update",
                    consecutive_useless
                );
                termination = Termination::CyclingDetected;
                break;
            }
            continue;
        }

        consecutive_useless = 0;
        // Merge under the key the entry already lives at, even when that
        // is the filename+size fallback of a rebuilt index.
        let mut entry = IndexEntry::from_remote_item(&item);
        entry.identity = key.unwrap_or(entry.identity);
        index.upsert(entry);
        updated += 1;

        if updated % config.checkpoint_interval == 0 {
            index.save(&index_path)?;
            log::debug!("refresh checkpoint: {} updated", updated);
        }

        if updated as usize >= needs_update {
            log::info!("all {} incomplete entries updated", needs_update);
            break;
        }
    }

    index.save(&index_path)?;

    Ok(RefreshReport {
        checked,
        updated,
        remaining: entries_missing_metadata(index),
        termination,
    })
}
