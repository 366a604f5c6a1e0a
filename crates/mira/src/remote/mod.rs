//! Boundary to the remote media library.
//!
//! The remote offers three capabilities: enumerate items, fetch bytes,
//! delete by identity. No ordering, pagination stability, or idempotence is
//! assumed from enumeration; the sync engine tolerates repeated and
//! reordered items. Transport and session management live behind this trait
//! and are not part of this crate.

pub mod rclone;

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// Session is no longer valid. Fatal for the current run; recovery is
    /// an external re-authentication concern.
    #[error("authentication expired")]
    AuthExpired,

    /// Timeout, rate limit, or similar. Retried with a fixed delay.
    #[error("transient remote error: {0}")]
    Transient(String),

    #[error("remote item not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::AuthExpired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Photo,
    Video,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Photo => "photo",
            ItemKind::Video => "video",
        }
    }

    /// Classify a media file by extension; `None` for non-media.
    pub fn from_extension(ext: &str) -> Option<Self> {
        const PHOTO: &[&str] = &["heic", "heif", "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"];
        const VIDEO: &[&str] = &["mov", "mp4", "m4v"];

        let ext = ext.to_ascii_lowercase();
        if PHOTO.contains(&ext.as_str()) {
            Some(ItemKind::Photo)
        } else if VIDEO.contains(&ext.as_str()) {
            Some(ItemKind::Video)
        } else {
            None
        }
    }
}

/// One item as the remote describes it. Metadata only; bytes come from
/// [`RemoteLibrary::fetch`].
#[derive(Debug, Clone)]
pub struct RemoteItem {
    pub remote_id: Option<String>,
    pub filename: String,
    pub kind: ItemKind,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub added_date: Option<DateTime<Utc>>,
    pub asset_date: Option<DateTime<Utc>>,
    pub created_date: Option<DateTime<Utc>>,
}

impl RemoteItem {
    /// Stable key used to deduplicate this item against the local index:
    /// the provider-assigned id when present, else filename plus size.
    pub fn identity(&self) -> String {
        match &self.remote_id {
            Some(id) => id.clone(),
            None => format!("{}:{}", self.filename, self.size_bytes),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Capability surface of the remote media library.
pub trait RemoteLibrary {
    /// Unordered, possibly repeating enumeration of the collection. The
    /// iterator is detached from the adapter so callers can fetch while
    /// enumerating.
    fn items(&mut self) -> RemoteResult<Box<dyn Iterator<Item = RemoteResult<RemoteItem>>>>;

    fn fetch(&mut self, item: &RemoteItem) -> RemoteResult<Vec<u8>>;

    fn delete(&mut self, identity: &str) -> RemoteResult<()>;
}

/// Retry a remote call a bounded number of times with a fixed delay.
/// Only transient errors are retried; auth expiry and not-found surface
/// immediately.
pub fn with_retry<T, F>(attempts: u32, delay: Duration, mut call: F) -> RemoteResult<T>
where
    F: FnMut() -> RemoteResult<T>,
{
    let mut last_err = RemoteError::Transient("no attempts made".to_string());

    for attempt in 1..=attempts.max(1) {
        match call() {
            Ok(value) => return Ok(value),
            Err(e) if matches!(e, RemoteError::Transient(_)) => {
                log::warn!("remote call failed (attempt {}/{}): {}", attempt, attempts, e);
                last_err = e;
                if attempt < attempts {
                    std::thread::sleep(delay);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err)
}
