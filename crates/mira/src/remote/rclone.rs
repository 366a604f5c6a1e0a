//! `RemoteLibrary` backed by the external `rclone` tool.
//!
//! Transport, authentication, and provider quirks all live in rclone; this
//! adapter only maps the capability surface onto subprocess invocations.
//! Listing gives modification times but no asset/added dates, durations,
//! or dimensions, so rules needing those simply never match items synced
//! through this backend.

use crate::remote::{ItemKind, RemoteError, RemoteItem, RemoteLibrary, RemoteResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::process::{Command, Stdio};

pub struct RcloneRemote {
    /// An rclone path such as `photos:media/by-year`.
    remote: String,
}

#[derive(Debug, Deserialize)]
struct RcloneEntry {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Size")]
    size: i64,
    #[serde(rename = "ModTime")]
    mod_time: Option<String>,
    #[serde(rename = "IsDir", default)]
    is_dir: bool,
}

impl RcloneRemote {
    pub fn new(remote: impl Into<String>) -> Self {
        Self { remote: remote.into() }
    }

    pub fn is_available() -> bool {
        Command::new("rclone")
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run(&self, args: &[&str]) -> RemoteResult<Vec<u8>> {
        let mut cmd = Command::new("rclone");
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        log::debug!("executing rclone: {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| RemoteError::Transient(format!("failed to execute rclone: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(classify_failure(&stderr));
        }

        Ok(output.stdout)
    }
}

/// rclone reports auth problems in its stderr; everything else is treated
/// as transient and left to the retry wrapper.
fn classify_failure(stderr: &str) -> RemoteError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("unauthorized")
        || lowered.contains("401")
        || lowered.contains("token expired")
        || lowered.contains("couldn't fetch token")
    {
        RemoteError::AuthExpired
    } else if lowered.contains("not found") || lowered.contains("404") {
        RemoteError::NotFound(stderr.trim().to_string())
    } else {
        RemoteError::Transient(stderr.trim().to_string())
    }
}

fn entry_to_item(entry: RcloneEntry) -> Option<RemoteItem> {
    if entry.is_dir {
        return None;
    }
    let kind = std::path::Path::new(&entry.name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ItemKind::from_extension)?;

    let created_date = entry
        .mod_time
        .as_deref()
        .and_then(|t| t.parse::<DateTime<Utc>>().ok());

    Some(RemoteItem {
        remote_id: Some(entry.path),
        filename: entry.name,
        kind,
        size_bytes: entry.size.max(0) as u64,
        width: None,
        height: None,
        duration_seconds: None,
        added_date: None,
        asset_date: None,
        created_date,
    })
}

impl RemoteLibrary for RcloneRemote {
    fn items(&mut self) -> RemoteResult<Box<dyn Iterator<Item = RemoteResult<RemoteItem>>>> {
        let stdout = self.run(&["lsjson", "--recursive", "--files-only", &self.remote])?;

        let entries: Vec<RcloneEntry> = serde_json::from_slice(&stdout)
            .map_err(|e| RemoteError::Transient(format!("failed to parse rclone listing: {}", e)))?;

        Ok(Box::new(
            entries.into_iter().filter_map(entry_to_item).map(Ok),
        ))
    }

    fn fetch(&mut self, item: &RemoteItem) -> RemoteResult<Vec<u8>> {
        let path = item
            .remote_id
            .as_deref()
            .unwrap_or(item.filename.as_str());
        let target = format!("{}/{}", self.remote, path);
        self.run(&["cat", &target])
    }

    fn delete(&mut self, identity: &str) -> RemoteResult<()> {
        let target = format!("{}/{}", self.remote, identity);
        self.run(&["deletefile", &target])?;
        Ok(())
    }
}
