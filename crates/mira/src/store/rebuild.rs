//! Reconstruct the index from the local mirror tree.
//!
//! Used when the index document is lost or predates the mirror. Dates come
//! from filesystem metadata and remote-only fields stay empty, so a
//! metadata refresh against the remote is the natural follow-up.

use crate::error::Result;
use crate::remote::ItemKind;
use crate::store::index::{IndexEntry, LibraryIndex};
use chrono::{DateTime, Utc};
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    pub files_indexed: usize,
    pub photos: usize,
    pub videos: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Walk the mirror and build a fresh index from what is on disk. The trash
/// subtree and non-media files are skipped.
pub fn rebuild_index(mirror_root: &Path) -> Result<(LibraryIndex, RebuildStats)> {
    let mut index = LibraryIndex::new();
    let mut stats = RebuildStats::default();

    for entry in WalkDir::new(mirror_root).into_iter().filter_entry(|e| {
        e.file_name().to_string_lossy() != "trash"
    }) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("walk error under {}: {}", mirror_root.display(), e);
                stats.errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let kind = match path.extension().and_then(|e| e.to_str()).and_then(ItemKind::from_extension) {
            Some(kind) => kind,
            None => {
                stats.skipped += 1;
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("failed to stat {}: {}", path.display(), e);
                stats.errors += 1;
                continue;
            }
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let size_bytes = metadata.len();

        let created_date = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let relative_path = path.strip_prefix(mirror_root).unwrap_or(path).to_path_buf();

        index.upsert(IndexEntry {
            identity: format!("{}:{}", filename, size_bytes),
            filename,
            kind,
            size_bytes,
            width: None,
            height: None,
            duration_seconds: None,
            added_date: None,
            asset_date: None,
            created_date,
            local_path: Some(relative_path),
            fingerprint: None,
            content_hash: None,
            remote_id: None,
        });

        stats.files_indexed += 1;
        match kind {
            ItemKind::Photo => stats.photos += 1,
            ItemKind::Video => stats.videos += 1,
        }
    }

    Ok((index, stats))
}
