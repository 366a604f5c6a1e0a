//! Recoverable local deletions.
//!
//! Files leave the mirror by moving into a `trash/` subtree that mirrors
//! their relative layout, recorded in a manifest so they can be restored
//! later. Remote deletion is a separate concern; the trash only ever holds
//! local copies.

use crate::error::{MiraError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashRecord {
    /// Index identity of the item, when the caller knows it.
    pub identity: Option<String>,
    /// Path relative to the mirror root the file came from.
    pub original_path: PathBuf,
    /// Path relative to the trash root the file now lives at.
    pub trashed_path: PathBuf,
    pub trashed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrashManifest {
    records: Vec<TrashRecord>,
}

pub struct Trash {
    mirror_root: PathBuf,
    trash_root: PathBuf,
    manifest: TrashManifest,
}

impl Trash {
    pub fn open(mirror_root: &Path) -> Result<Self> {
        let trash_root = mirror_root.join("trash");
        let manifest_path = trash_root.join(MANIFEST_FILE);

        let manifest = if manifest_path.exists() {
            serde_json::from_str(&fs::read_to_string(&manifest_path)?)?
        } else {
            TrashManifest::default()
        };

        Ok(Self {
            mirror_root: mirror_root.to_path_buf(),
            trash_root,
            manifest,
        })
    }

    pub fn records(&self) -> &[TrashRecord] {
        &self.manifest.records
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.records.is_empty()
    }

    /// Move a mirror file into the trash, preserving its relative path.
    /// A name collision in the trash gets a timestamp suffix.
    pub fn stage(&mut self, relative_path: &Path, identity: Option<&str>) -> Result<TrashRecord> {
        let src = self.mirror_root.join(relative_path);
        if !src.exists() {
            return Err(MiraError::TrashRecordNotFound(
                relative_path.display().to_string(),
            ));
        }

        let mut dst = self.trash_root.join(relative_path);
        if dst.exists() {
            let stamp = Utc::now().format("%Y%m%d_%H%M%S");
            let stem = dst.file_stem().unwrap_or_default().to_string_lossy().to_string();
            let ext = dst
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            dst = dst.with_file_name(format!("{}_{}{}", stem, stamp, ext));
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src, &dst)?;

        let record = TrashRecord {
            identity: identity.map(|s| s.to_string()),
            original_path: relative_path.to_path_buf(),
            trashed_path: dst.strip_prefix(&self.trash_root).unwrap_or(&dst).to_path_buf(),
            trashed_at: Utc::now(),
        };
        self.manifest.records.push(record.clone());
        self.save_manifest()?;

        Ok(record)
    }

    /// Move a trashed file back to its original mirror location. Returns
    /// the record so the caller can repair the index entry.
    pub fn restore(&mut self, original_path: &Path) -> Result<TrashRecord> {
        let pos = self
            .manifest
            .records
            .iter()
            .position(|r| r.original_path == original_path)
            .ok_or_else(|| MiraError::TrashRecordNotFound(original_path.display().to_string()))?;

        let record = self.manifest.records.remove(pos);
        let src = self.trash_root.join(&record.trashed_path);
        let dst = self.mirror_root.join(&record.original_path);

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src, &dst)?;
        self.save_manifest()?;

        Ok(record)
    }

    /// Permanently delete one trashed file and its record, if present.
    pub fn remove(&mut self, original_path: &Path) -> Result<bool> {
        let pos = self
            .manifest
            .records
            .iter()
            .position(|r| r.original_path == original_path);
        self.remove_at(pos)
    }

    /// Permanently delete the trashed copy of an item by identity.
    pub fn remove_by_identity(&mut self, identity: &str) -> Result<bool> {
        let pos = self
            .manifest
            .records
            .iter()
            .position(|r| r.identity.as_deref() == Some(identity));
        self.remove_at(pos)
    }

    fn remove_at(&mut self, pos: Option<usize>) -> Result<bool> {
        let Some(pos) = pos else { return Ok(false) };

        let record = self.manifest.records.remove(pos);
        let trashed = self.trash_root.join(&record.trashed_path);
        if trashed.exists() {
            fs::remove_file(&trashed)?;
        }
        self.save_manifest()?;

        Ok(true)
    }

    /// Permanently delete everything in the trash. Returns the number of
    /// records purged.
    pub fn purge(&mut self) -> Result<usize> {
        let count = self.manifest.records.len();

        for record in std::mem::take(&mut self.manifest.records) {
            let trashed = self.trash_root.join(&record.trashed_path);
            if trashed.exists() {
                fs::remove_file(&trashed)?;
            }
        }
        self.save_manifest()?;

        Ok(count)
    }

    fn save_manifest(&self) -> Result<()> {
        fs::create_dir_all(&self.trash_root)?;
        let path = self.trash_root.join(MANIFEST_FILE);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.manifest)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
