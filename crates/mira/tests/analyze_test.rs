use chrono::{Duration, Utc};
use image::{DynamicImage, GrayImage, Luma};
use mira_lib::{AnalyzeConfig, IndexEntry, ItemKind, LibraryIndex, QualityAnalyzer};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn photo_entry(identity: &str, rel: &str, asset_days_ago: Option<i64>) -> IndexEntry {
    IndexEntry {
        identity: identity.to_string(),
        filename: Path::new(rel)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string(),
        kind: ItemKind::Photo,
        size_bytes: 1024,
        width: Some(64),
        height: Some(64),
        duration_seconds: None,
        added_date: None,
        asset_date: asset_days_ago.map(|d| Utc::now() - Duration::days(d)),
        created_date: None,
        local_path: Some(PathBuf::from(rel)),
        fingerprint: None,
        content_hash: None,
        remote_id: None,
    }
}

fn write_image(dir: &Path, rel: &str, img: &DynamicImage) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(&path).unwrap();
}

/// Bright, monotonically darkening left-to-right; strong consistent
/// horizontal gradient, so its fingerprint is far from the reverse ramp.
fn falling_ramp() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([255 - (x * 3) as u8])))
}

fn rising_ramp() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([64 + (x * 3) as u8])))
}

fn dark_flat() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([8])))
}

fn bright_checkerboard() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, y| {
        if (x + y) % 2 == 0 {
            Luma([255])
        } else {
            Luma([120])
        }
    }))
}

#[test]
fn identical_images_group_with_oldest_as_canonical() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "2023/01/copy_new.png", &falling_ramp());
    write_image(dir.path(), "2022/01/copy_old.png", &falling_ramp());
    write_image(dir.path(), "2023/02/unrelated.png", &rising_ramp());

    let mut index = LibraryIndex::new();
    index.upsert(photo_entry("copy_new", "2023/01/copy_new.png", Some(100)));
    index.upsert(photo_entry("copy_old", "2022/01/copy_old.png", Some(500)));
    index.upsert(photo_entry("unrelated", "2023/02/unrelated.png", Some(50)));

    let config = AnalyzeConfig::default();
    let analyzer = QualityAnalyzer::new(&config, dir.path().to_path_buf()).unwrap();
    let report = analyzer.analyze(&mut index, Utc::now()).unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.duplicate_groups.len(), 1);
    assert_eq!(report.duplicate_groups[0].canonical, "copy_old");
    assert_eq!(report.duplicate_groups[0].duplicates, vec!["copy_new".to_string()]);

    // Fingerprints were cached back into the index.
    assert!(index.get("copy_new").unwrap().fingerprint.is_some());
    assert!(index.get("unrelated").unwrap().fingerprint.is_some());
}

#[test]
fn dark_and_blurry_images_are_flagged() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "2023/01/black.png", &dark_flat());
    write_image(dir.path(), "2023/01/crisp.png", &bright_checkerboard());

    let mut index = LibraryIndex::new();
    index.upsert(photo_entry("black", "2023/01/black.png", Some(10)));
    index.upsert(photo_entry("crisp", "2023/01/crisp.png", Some(10)));

    let config = AnalyzeConfig::default();
    let analyzer = QualityAnalyzer::new(&config, dir.path().to_path_buf()).unwrap();
    let report = analyzer.analyze(&mut index, Utc::now()).unwrap();

    let dark: Vec<&str> = report.dark.iter().map(|s| s.identity.as_str()).collect();
    let blurry: Vec<&str> = report.blurry.iter().map(|s| s.identity.as_str()).collect();

    assert_eq!(dark, vec!["black"]);
    // A featureless frame has no edges either.
    assert!(blurry.contains(&"black"));
    assert!(!blurry.contains(&"crisp"));
}

#[test]
fn old_screenshots_are_flagged_by_name_and_age() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "2022/06/Screenshot_2022-06-01.png", &bright_checkerboard());
    write_image(dir.path(), "2024/05/Screenshot_recent.png", &bright_checkerboard());
    write_image(dir.path(), "2022/06/IMG_0001.png", &bright_checkerboard());

    let mut index = LibraryIndex::new();
    index.upsert(photo_entry(
        "old_shot",
        "2022/06/Screenshot_2022-06-01.png",
        Some(400),
    ));
    index.upsert(photo_entry("new_shot", "2024/05/Screenshot_recent.png", Some(30)));
    index.upsert(photo_entry("camera", "2022/06/IMG_0001.png", Some(400)));

    let config = AnalyzeConfig::default();
    let analyzer = QualityAnalyzer::new(&config, dir.path().to_path_buf()).unwrap();
    let report = analyzer.analyze(&mut index, Utc::now()).unwrap();

    let stale: Vec<&str> = report
        .stale_screenshots
        .iter()
        .map(|s| s.identity.as_str())
        .collect();

    assert_eq!(stale, vec!["old_shot"]);
}

#[test]
fn unreadable_images_are_counted_as_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("2023/01")).unwrap();
    std::fs::write(dir.path().join("2023/01/corrupt.jpg"), b"not actually a jpeg").unwrap();
    write_image(dir.path(), "2023/01/fine.png", &bright_checkerboard());

    let mut index = LibraryIndex::new();
    index.upsert(photo_entry("corrupt", "2023/01/corrupt.jpg", Some(10)));
    index.upsert(photo_entry("fine", "2023/01/fine.png", Some(10)));

    let config = AnalyzeConfig::default();
    let analyzer = QualityAnalyzer::new(&config, dir.path().to_path_buf()).unwrap();
    let report = analyzer.analyze(&mut index, Utc::now()).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("corrupt.jpg"));
    // The run survives and still covers the readable image.
    assert_eq!(report.scanned, 2);
}

#[test]
fn videos_and_undownloaded_entries_are_excluded() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "2023/01/present.png", &bright_checkerboard());

    let mut index = LibraryIndex::new();
    index.upsert(photo_entry("present", "2023/01/present.png", Some(10)));

    let mut video = photo_entry("movie", "2023/01/movie.mov", Some(10));
    video.kind = ItemKind::Video;
    index.upsert(video);

    let mut not_downloaded = photo_entry("remote_only", "x.png", Some(10));
    not_downloaded.local_path = None;
    index.upsert(not_downloaded);

    let config = AnalyzeConfig::default();
    let analyzer = QualityAnalyzer::new(&config, dir.path().to_path_buf()).unwrap();
    let report = analyzer.analyze(&mut index, Utc::now()).unwrap();

    assert_eq!(report.scanned, 1);
    assert!(report.errors.is_empty());
}
