use chrono::{DateTime, Duration, Utc};
use mira_lib::{
    CancelToken, DeleteConfig, ItemKind, RemoteError, RemoteItem, RemoteLibrary, SyncConfig,
};
use std::collections::HashSet;

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub fn photo(filename: &str, size: u64, added: Option<DateTime<Utc>>) -> RemoteItem {
    RemoteItem {
        remote_id: None,
        filename: filename.to_string(),
        kind: ItemKind::Photo,
        size_bytes: size,
        width: Some(4032),
        height: Some(3024),
        duration_seconds: None,
        added_date: added,
        asset_date: None,
        created_date: None,
    }
}

/// Small thresholds so tests exercise the same paths without thousands of
/// items.
pub fn test_sync_config() -> SyncConfig {
    SyncConfig {
        cycle_threshold_full: 5,
        cycle_threshold_windowed: 3,
        checkpoint_interval: 2,
        retry_attempts: 2,
        retry_delay_secs: 0,
    }
}

pub fn test_delete_config() -> DeleteConfig {
    DeleteConfig {
        batch_size: 2,
        batch_delay_secs: 0,
        retry_attempts: 2,
        retry_delay_secs: 0,
    }
}

/// Scripted remote: a fixed enumeration sequence, optionally repeating its
/// last item, with failure injection per identity and call recording.
pub struct MockRemote {
    pub sequence: Vec<RemoteItem>,
    pub repeat_last: bool,
    pub fetch_failures: HashSet<String>,
    pub auth_fail_fetch: HashSet<String>,
    pub delete_failures: HashSet<String>,
    pub auth_fail_delete: HashSet<String>,
    pub fetch_calls: Vec<String>,
    pub delete_calls: Vec<String>,
    pub cancel_after_fetches: Option<(usize, CancelToken)>,
}

impl MockRemote {
    pub fn new(sequence: Vec<RemoteItem>) -> Self {
        Self {
            sequence,
            repeat_last: false,
            fetch_failures: HashSet::new(),
            auth_fail_fetch: HashSet::new(),
            delete_failures: HashSet::new(),
            auth_fail_delete: HashSet::new(),
            fetch_calls: Vec::new(),
            delete_calls: Vec::new(),
            cancel_after_fetches: None,
        }
    }

    pub fn fetches_for(&self, identity: &str) -> usize {
        self.fetch_calls.iter().filter(|c| c.as_str() == identity).count()
    }
}

impl RemoteLibrary for MockRemote {
    fn items(
        &mut self,
    ) -> Result<Box<dyn Iterator<Item = Result<RemoteItem, RemoteError>>>, RemoteError> {
        let sequence = self.sequence.clone();
        let last = sequence.last().cloned();

        if self.repeat_last && last.is_some() {
            let last = last.unwrap();
            // Bounded so a termination bug fails the test instead of
            // hanging it.
            let tail = std::iter::repeat_with(move || Ok::<RemoteItem, RemoteError>(last.clone()))
                .take(100_000);
            Ok(Box::new(sequence.into_iter().map(Ok).chain(tail)))
        } else {
            Ok(Box::new(sequence.into_iter().map(Ok)))
        }
    }

    fn fetch(&mut self, item: &RemoteItem) -> Result<Vec<u8>, RemoteError> {
        let identity = item.identity();
        self.fetch_calls.push(identity.clone());

        if let Some((after, token)) = &self.cancel_after_fetches {
            if self.fetch_calls.len() >= *after {
                token.cancel();
            }
        }

        if self.auth_fail_fetch.contains(&identity) {
            return Err(RemoteError::AuthExpired);
        }
        if self.fetch_failures.contains(&identity) {
            return Err(RemoteError::Transient("simulated timeout".to_string()));
        }

        Ok(vec![0xAB; item.size_bytes as usize])
    }

    fn delete(&mut self, identity: &str) -> Result<(), RemoteError> {
        self.delete_calls.push(identity.to_string());

        if self.auth_fail_delete.contains(identity) {
            return Err(RemoteError::AuthExpired);
        }
        if self.delete_failures.contains(identity) {
            return Err(RemoteError::Transient("simulated rate limit".to_string()));
        }

        Ok(())
    }
}
