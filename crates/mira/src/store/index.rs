//! Durable index of every known media item.
//!
//! The index is a single self-describing JSON document, read and written
//! wholesale. Saves go through a temp file plus rename so a crashed writer
//! never leaves a truncated index behind. One entry per identity; the sync
//! engine is the only writer during sync, the deletion executor the only
//! writer during deletion.

use crate::dates::resolve_date;
use crate::error::{MiraError, Result};
use crate::remote::{ItemKind, RemoteItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub identity: String,
    pub filename: String,
    pub kind: ItemKind,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub added_date: Option<DateTime<Utc>>,
    pub asset_date: Option<DateTime<Utc>>,
    pub created_date: Option<DateTime<Utc>>,
    /// Relative path under the mirror root; `None` until downloaded.
    pub local_path: Option<PathBuf>,
    /// 64-bit perceptual hash, computed lazily for photos.
    pub fingerprint: Option<u64>,
    /// blake3 of the fetched bytes.
    pub content_hash: Option<String>,
    pub remote_id: Option<String>,
}

impl IndexEntry {
    pub fn from_remote_item(item: &RemoteItem) -> Self {
        Self {
            identity: item.identity(),
            filename: item.filename.clone(),
            kind: item.kind,
            size_bytes: item.size_bytes,
            width: item.width,
            height: item.height,
            duration_seconds: item.duration_seconds,
            added_date: item.added_date,
            asset_date: item.asset_date,
            created_date: item.created_date,
            local_path: None,
            fingerprint: None,
            content_hash: None,
            remote_id: item.remote_id.clone(),
        }
    }

    pub fn resolved_date(&self) -> Option<DateTime<Utc>> {
        resolve_date(self.added_date, self.asset_date, self.created_date)
    }

    /// Identity to hand to the remote adapter: the provider id when we
    /// learned one, else the index key.
    pub fn remote_identity(&self) -> &str {
        self.remote_id.as_deref().unwrap_or(&self.identity)
    }

    pub fn is_photo(&self) -> bool {
        self.kind == ItemKind::Photo
    }

    pub fn is_video(&self) -> bool {
        self.kind == ItemKind::Video
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_items: usize,
    pub photos: usize,
    pub videos: usize,
    pub downloaded: usize,
    pub total_bytes: u64,
}

/// The whole index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryIndex {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub item_count: usize,
    pub entries: BTreeMap<String, IndexEntry>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            item_count: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MiraError::IndexNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load the index, or start an empty one if none exists yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(index) => Ok(index),
            Err(MiraError::IndexNotFound(_)) => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    /// Persist the document atomically: write a sibling temp file, then
    /// rename over the target.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        self.item_count = self.entries.len();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn get(&self, identity: &str) -> Option<&IndexEntry> {
        self.entries.get(identity)
    }

    /// Find the key a remote item is indexed under: its identity, or the
    /// filename+size fallback a rebuilt index would have used before the
    /// provider id was known.
    pub fn key_for_item(&self, item: &RemoteItem) -> Option<String> {
        let identity = item.identity();
        if self.entries.contains_key(&identity) {
            return Some(identity);
        }
        let fallback = format!("{}:{}", item.filename, item.size_bytes);
        if self.entries.contains_key(&fallback) {
            return Some(fallback);
        }
        None
    }

    /// Insert or merge an entry. Remote metadata takes the later write;
    /// locally-derived fields (`local_path`, `fingerprint`, `content_hash`)
    /// are only overwritten by populated values, so a metadata-only re-sync
    /// never forgets where the bytes live.
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self.entries.get_mut(&entry.identity) {
            Some(existing) => {
                existing.filename = entry.filename;
                existing.kind = entry.kind;
                existing.size_bytes = entry.size_bytes;
                existing.width = entry.width.or(existing.width);
                existing.height = entry.height.or(existing.height);
                existing.duration_seconds = entry.duration_seconds.or(existing.duration_seconds);
                existing.added_date = entry.added_date.or(existing.added_date);
                existing.asset_date = entry.asset_date.or(existing.asset_date);
                existing.created_date = entry.created_date.or(existing.created_date);
                if entry.local_path.is_some() {
                    existing.local_path = entry.local_path;
                }
                if entry.fingerprint.is_some() {
                    existing.fingerprint = entry.fingerprint;
                }
                if entry.content_hash.is_some() {
                    existing.content_hash = entry.content_hash;
                }
                if entry.remote_id.is_some() {
                    existing.remote_id = entry.remote_id;
                }
            }
            None => {
                self.entries.insert(entry.identity.clone(), entry);
            }
        }
    }

    /// Remove an entry after a confirmed remote delete. Returns the removed
    /// entry, if any.
    pub fn remove(&mut self, identity: &str) -> Option<IndexEntry> {
        self.entries.remove(identity)
    }

    /// All entries in identity order.
    pub fn scan(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats::default();
        for entry in self.entries.values() {
            stats.total_items += 1;
            match entry.kind {
                ItemKind::Photo => stats.photos += 1,
                ItemKind::Video => stats.videos += 1,
            }
            if entry.local_path.is_some() {
                stats.downloaded += 1;
            }
            stats.total_bytes += entry.size_bytes;
        }
        stats
    }
}

impl Default for LibraryIndex {
    fn default() -> Self {
        Self::new()
    }
}
