mod common;

use common::*;
use mira_lib::{
    CancelToken, LibraryIndex, MiraError, ProgressStore, RemoteError, SyncEngine, SyncOptions,
    SyncReport, Termination,
};
use std::path::Path;
use tempfile::TempDir;

fn run_sync(
    remote: &mut MockRemote,
    mirror: &Path,
    window_days: Option<u32>,
    cancel: CancelToken,
) -> mira_lib::Result<SyncReport> {
    let index_path = mirror.join("index.json");
    let mut index = LibraryIndex::load_or_default(&index_path)?;
    let progress = ProgressStore::new(mirror.join("sync_progress.json"));

    let mut engine = SyncEngine::new(
        remote,
        &mut index,
        index_path.clone(),
        &progress,
        mirror.to_path_buf(),
        test_sync_config(),
        cancel,
    );
    let report = engine.run(&SyncOptions { window_days });
    drop(engine);

    index.save(&index_path)?;
    report
}

#[test]
fn downloads_unique_items_until_exhaustion() {
    let dir = TempDir::new().unwrap();
    let mut remote = MockRemote::new(vec![
        photo("IMG_0001.jpg", 100, Some(days_ago(1))),
        photo("IMG_0002.jpg", 200, Some(days_ago(2))),
        photo("IMG_0003.jpg", 300, Some(days_ago(3))),
    ]);

    let report = run_sync(&mut remote, dir.path(), None, CancelToken::new()).unwrap();

    assert_eq!(report.downloaded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.bytes_fetched, 600);

    let index = LibraryIndex::load(&dir.path().join("index.json")).unwrap();
    assert_eq!(index.stats().total_items, 3);

    // Files land under YYYY/MM from the resolved date.
    let entry = index.get("IMG_0001.jpg:100").unwrap();
    let local = entry.local_path.as_ref().unwrap();
    assert!(dir.path().join(local).exists());
    assert_eq!(local.file_name().unwrap(), "IMG_0001.jpg");
}

#[test]
fn second_run_downloads_nothing_new() {
    let dir = TempDir::new().unwrap();
    let sequence = vec![
        photo("IMG_0001.jpg", 100, Some(days_ago(1))),
        photo("IMG_0002.jpg", 200, Some(days_ago(2))),
    ];

    let mut first = MockRemote::new(sequence.clone());
    run_sync(&mut first, dir.path(), None, CancelToken::new()).unwrap();
    let after_first = std::fs::read_to_string(dir.path().join("index.json")).unwrap();

    let mut second = MockRemote::new(sequence);
    let report = run_sync(&mut second, dir.path(), None, CancelToken::new()).unwrap();

    assert_eq!(report.downloaded, 0);
    assert_eq!(report.skipped, 2);
    assert!(second.fetch_calls.is_empty());

    // Index content is unchanged apart from the refresh timestamp.
    let index = LibraryIndex::load(&dir.path().join("index.json")).unwrap();
    let reparsed: LibraryIndex = serde_json::from_str(&after_first).unwrap();
    assert_eq!(index.entries.len(), reparsed.entries.len());
    for (key, entry) in &index.entries {
        let old = &reparsed.entries[key];
        assert_eq!(entry.local_path, old.local_path);
        assert_eq!(entry.size_bytes, old.size_bytes);
        assert_eq!(entry.content_hash, old.content_hash);
    }
}

#[test]
fn cycling_detection_terminates_after_threshold_repeats() {
    let dir = TempDir::new().unwrap();
    let mut remote = MockRemote::new(vec![
        photo("IMG_0001.jpg", 100, Some(days_ago(1))),
        photo("IMG_0002.jpg", 200, Some(days_ago(2))),
        photo("IMG_0003.jpg", 300, Some(days_ago(3))),
    ]);
    remote.repeat_last = true;

    let report = run_sync(&mut remote, dir.path(), None, CancelToken::new()).unwrap();

    assert_eq!(report.termination, Termination::CyclingDetected);
    assert_eq!(report.downloaded, 3);
    // Exactly cycle_threshold_full consecutive repeats before stopping.
    assert_eq!(report.skipped, test_sync_config().cycle_threshold_full as u64);
}

#[test]
fn windowed_sync_stops_at_first_old_item() {
    let dir = TempDir::new().unwrap();
    let mut remote = MockRemote::new(vec![
        photo("new1.jpg", 100, Some(days_ago(1))),
        photo("new2.jpg", 100, Some(days_ago(3))),
        photo("old.jpg", 100, Some(days_ago(30))),
        photo("newer.jpg", 100, Some(days_ago(2))),
    ]);

    let report = run_sync(&mut remote, dir.path(), Some(7), CancelToken::new()).unwrap();

    assert_eq!(report.termination, Termination::WindowReached);
    assert_eq!(report.downloaded, 2);
    // Nothing at or after the boundary item is ever fetched.
    assert_eq!(remote.fetch_calls, vec!["new1.jpg:100", "new2.jpg:100"]);
}

#[test]
fn transient_fetch_failures_are_recorded_and_retried() {
    let dir = TempDir::new().unwrap();
    let mut remote = MockRemote::new(vec![
        photo("good.jpg", 100, Some(days_ago(1))),
        photo("flaky.jpg", 100, Some(days_ago(2))),
        photo("fine.jpg", 100, Some(days_ago(3))),
    ]);
    remote.fetch_failures.insert("flaky.jpg:100".to_string());

    let report = run_sync(&mut remote, dir.path(), None, CancelToken::new()).unwrap();

    assert_eq!(report.downloaded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.termination, Termination::Exhausted);
    // Retried the configured number of attempts before giving up.
    assert_eq!(remote.fetches_for("flaky.jpg:100"), test_sync_config().retry_attempts as usize);
}

#[test]
fn auth_expiry_aborts_preserving_checkpoint() {
    let dir = TempDir::new().unwrap();
    let sequence = vec![
        photo("first.jpg", 100, Some(days_ago(1))),
        photo("locked.jpg", 100, Some(days_ago(2))),
        photo("after.jpg", 100, Some(days_ago(3))),
    ];

    let mut remote = MockRemote::new(sequence.clone());
    remote.auth_fail_fetch.insert("locked.jpg:100".to_string());

    let result = run_sync(&mut remote, dir.path(), None, CancelToken::new());
    assert!(matches!(result, Err(MiraError::Remote(RemoteError::AuthExpired))));

    // The last-good checkpoint survives the abort.
    let progress = ProgressStore::new(dir.path().join("sync_progress.json"));
    let state = progress.load().unwrap();
    assert_eq!(state.stats.downloaded, 1);
    assert!(state.has_prior_progress());

    let index = LibraryIndex::load(&dir.path().join("index.json")).unwrap();
    assert!(index.contains("first.jpg:100"));

    // Re-running after re-authentication picks up where it stopped.
    let mut recovered = MockRemote::new(sequence);
    let report = run_sync(&mut recovered, dir.path(), None, CancelToken::new()).unwrap();
    assert_eq!(report.downloaded, 3);
    assert!(!recovered.fetch_calls.contains(&"first.jpg:100".to_string()));
}

#[test]
fn interrupt_checkpoints_and_resumes() {
    let dir = TempDir::new().unwrap();
    let sequence = vec![
        photo("a.jpg", 100, Some(days_ago(1))),
        photo("b.jpg", 100, Some(days_ago(2))),
        photo("c.jpg", 100, Some(days_ago(3))),
        photo("d.jpg", 100, Some(days_ago(4))),
    ];

    let cancel = CancelToken::new();
    let mut remote = MockRemote::new(sequence.clone());
    remote.cancel_after_fetches = Some((2, cancel.clone()));

    let report = run_sync(&mut remote, dir.path(), None, cancel).unwrap();
    assert_eq!(report.termination, Termination::Interrupted);
    assert_eq!(report.downloaded, 2);

    // No new item is started after the signal.
    assert_eq!(remote.fetch_calls.len(), 2);

    let mut resumed = MockRemote::new(sequence);
    let report = run_sync(&mut resumed, dir.path(), None, CancelToken::new()).unwrap();
    assert_eq!(report.downloaded, 4);
    assert_eq!(resumed.fetch_calls, vec!["c.jpg:100", "d.jpg:100"]);
}

#[test]
fn refresh_fills_missing_metadata_without_fetching() {
    let dir = TempDir::new().unwrap();

    // A rebuilt-style index: filename+size identities, no remote metadata.
    let index_path = dir.path().join("index.json");
    let mut index = LibraryIndex::load_or_default(&index_path).unwrap();
    let mut bare = mira_lib::IndexEntry::from_remote_item(&photo("IMG_0001.jpg", 100, None));
    bare.local_path = Some("2023/05/IMG_0001.jpg".into());
    index.upsert(bare);
    index.save(&index_path).unwrap();

    // The remote knows the same item under a provider id, with dates.
    let mut item = photo("IMG_0001.jpg", 100, Some(days_ago(10)));
    item.remote_id = Some("provider-abc".to_string());
    item.asset_date = Some(days_ago(12));
    let mut remote = MockRemote::new(vec![item]);

    let report = mira_lib::refresh_metadata(
        &mut remote,
        &mut index,
        index_path.clone(),
        &test_sync_config(),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.remaining, 0);
    assert!(remote.fetch_calls.is_empty());

    // Metadata merged under the existing key; local fields survive.
    let entry = index.get("IMG_0001.jpg:100").unwrap();
    assert!(entry.asset_date.is_some());
    assert_eq!(entry.remote_id.as_deref(), Some("provider-abc"));
    assert!(entry.local_path.is_some());
}

#[test]
fn undated_items_are_not_window_filtered() {
    let dir = TempDir::new().unwrap();
    let mut remote = MockRemote::new(vec![
        photo("dated.jpg", 100, Some(days_ago(1))),
        photo("undated.jpg", 100, None),
        photo("recent.jpg", 100, Some(days_ago(2))),
    ]);

    let report = run_sync(&mut remote, dir.path(), Some(7), CancelToken::new()).unwrap();

    // A missing date never counts as "too old".
    assert_eq!(report.downloaded, 3);
    assert_eq!(report.termination, Termination::Exhausted);

    let index = LibraryIndex::load(&dir.path().join("index.json")).unwrap();
    let entry = index.get("undated.jpg:100").unwrap();
    assert!(entry.local_path.as_ref().unwrap().starts_with("undated"));
}
