//! Quality analysis of the locally mirrored photos.
//!
//! Consumes the index and the mirror, never the remote. Produces an
//! advisory report of suspect items: near-duplicate groups, blurry and
//! dark images, and stale screenshots. Unreadable files are counted as
//! errors and skipped; videos and not-yet-downloaded entries are excluded.

pub mod fingerprint;
pub mod metrics;

use crate::config::AnalyzeConfig;
use crate::dates::age_months;
use crate::error::{MiraError, Result};
use crate::store::index::LibraryIndex;
use chrono::{DateTime, Utc};
use fingerprint::Fingerprint;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// The member kept: oldest asset date, ties broken by identity.
    pub canonical: String,
    pub duplicates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspectImage {
    pub identity: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleScreenshot {
    pub identity: String,
    pub age_months: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: Option<DateTime<Utc>>,
    pub scanned: usize,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub blurry: Vec<SuspectImage>,
    pub dark: Vec<SuspectImage>,
    pub stale_screenshots: Vec<StaleScreenshot>,
    pub errors: Vec<String>,
}

impl QualityReport {
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_groups.iter().map(|g| g.duplicates.len()).sum()
    }

    /// Identities flagged for any reason. Canonical group members are kept
    /// and never appear here.
    pub fn suspect_identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self
            .duplicate_groups
            .iter()
            .flat_map(|g| g.duplicates.iter().cloned())
            .chain(self.blurry.iter().map(|s| s.identity.clone()))
            .chain(self.dark.iter().map(|s| s.identity.clone()))
            .chain(self.stale_screenshots.iter().map(|s| s.identity.clone()))
            .collect();
        identities.sort();
        identities.dedup();
        identities
    }

    pub fn has_suspects(&self) -> bool {
        !self.suspect_identities().is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Turn a report's suspects into staging candidates for the deletion
/// executor, one per identity with every reason it was flagged for.
pub fn staging_candidates(
    report: &QualityReport,
    index: &LibraryIndex,
) -> Vec<crate::criteria::DeletionCandidate> {
    use std::collections::BTreeMap;

    let mut reasons: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for group in &report.duplicate_groups {
        for dup in &group.duplicates {
            reasons
                .entry(dup.clone())
                .or_default()
                .push(format!("duplicate of {}", group.canonical));
        }
    }
    for suspect in &report.blurry {
        reasons
            .entry(suspect.identity.clone())
            .or_default()
            .push(format!("blurry (score {:.1})", suspect.score));
    }
    for suspect in &report.dark {
        reasons
            .entry(suspect.identity.clone())
            .or_default()
            .push(format!("dark (brightness {:.1})", suspect.score));
    }
    for stale in &report.stale_screenshots {
        reasons
            .entry(stale.identity.clone())
            .or_default()
            .push(format!("stale screenshot ({:.1} months)", stale.age_months));
    }

    reasons
        .into_iter()
        .map(|(identity, reasons)| crate::criteria::DeletionCandidate {
            size_bytes: index.get(&identity).map(|e| e.size_bytes).unwrap_or(0),
            identity,
            matched_rule: "quality".to_string(),
            reason: reasons.join(", "),
        })
        .collect()
}

struct PhotoSample {
    identity: String,
    filename: String,
    relative_path: PathBuf,
    asset_date: Option<DateTime<Utc>>,
    resolved_date: Option<DateTime<Utc>>,
    fingerprint: Option<Fingerprint>,
}

pub struct QualityAnalyzer<'a> {
    config: &'a AnalyzeConfig,
    mirror_root: PathBuf,
    screenshot_globs: GlobSet,
}

impl<'a> QualityAnalyzer<'a> {
    pub fn new(config: &'a AnalyzeConfig, mirror_root: PathBuf) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.screenshot_patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    MiraError::Config(format!("invalid screenshot pattern '{}': {}", pattern, e))
                })?;
            builder.add(glob);
        }
        let screenshot_globs = builder
            .build()
            .map_err(|e| MiraError::Config(format!("failed to build screenshot globs: {}", e)))?;

        Ok(Self {
            config,
            mirror_root,
            screenshot_globs,
        })
    }

    /// Analyze every downloaded photo in the index. Fingerprints computed
    /// along the way are cached back into the index so repeated runs only
    /// decode what changed.
    pub fn analyze(&self, index: &mut LibraryIndex, now: DateTime<Utc>) -> Result<QualityReport> {
        let mut report = QualityReport {
            generated_at: Some(now),
            ..Default::default()
        };
        let mut samples: Vec<PhotoSample> = Vec::new();
        let mut computed: Vec<(String, u64)> = Vec::new();

        let photos: Vec<PhotoSample> = index
            .scan()
            .filter(|e| e.is_photo())
            .filter_map(|e| {
                let relative_path = e.local_path.clone()?;
                Some(PhotoSample {
                    identity: e.identity.clone(),
                    filename: e.filename.clone(),
                    relative_path,
                    asset_date: e.asset_date,
                    resolved_date: e.resolved_date(),
                    fingerprint: e.fingerprint.map(Fingerprint),
                })
            })
            .collect();

        for mut sample in photos {
            report.scanned += 1;
            let path = self.mirror_root.join(&sample.relative_path);

            let decoded = match image::open(&path) {
                Ok(img) => Some(img),
                Err(e) => {
                    if sample.fingerprint.is_none() {
                        report
                            .errors
                            .push(format!("{}: {}", sample.relative_path.display(), e));
                        continue;
                    }
                    // Fingerprint already cached; metrics are skipped but
                    // duplicate grouping can still use the entry.
                    None
                }
            };

            if let Some(img) = &decoded {
                if sample.fingerprint.is_none() {
                    let fp = Fingerprint::from_image(img);
                    computed.push((sample.identity.clone(), fp.0));
                    sample.fingerprint = Some(fp);
                }

                let luma = img.to_luma8();

                let sharpness = metrics::sharpness_score(&luma);
                if sharpness < self.config.blur_threshold {
                    report.blurry.push(SuspectImage {
                        identity: sample.identity.clone(),
                        score: sharpness,
                    });
                }

                let brightness = metrics::mean_brightness(&luma);
                if brightness < self.config.darkness_threshold {
                    report.dark.push(SuspectImage {
                        identity: sample.identity.clone(),
                        score: brightness,
                    });
                }
            }

            if self.is_screenshot(&sample.filename, &path) {
                if let Some(age) = sample.resolved_date.and_then(|d| age_months(d, now)) {
                    if age >= self.config.screenshot_age_months {
                        report.stale_screenshots.push(StaleScreenshot {
                            identity: sample.identity.clone(),
                            age_months: (age * 10.0).round() / 10.0,
                        });
                    }
                }
            }

            samples.push(sample);
        }

        report.duplicate_groups = group_duplicates(&samples, self.config.fingerprint_distance);

        for (identity, fp) in computed {
            if let Some(entry) = index.entries.get_mut(&identity) {
                entry.fingerprint = Some(fp);
            }
        }

        log::info!(
            "analyzed {} photos: {} duplicate groups, {} blurry, {} dark, {} stale screenshots, {} errors",
            report.scanned,
            report.duplicate_groups.len(),
            report.blurry.len(),
            report.dark.len(),
            report.stale_screenshots.len(),
            report.errors.len()
        );

        Ok(report)
    }

    /// Screenshots are named like screenshots and carry no camera EXIF.
    fn is_screenshot(&self, filename: &str, path: &Path) -> bool {
        if !self.screenshot_globs.is_match(filename) {
            return false;
        }
        !has_camera_metadata(path).unwrap_or(false)
    }
}

fn has_camera_metadata(path: &Path) -> Option<bool> {
    let file = fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    Some(
        exif.get_field(exif::Tag::Make, exif::In::PRIMARY).is_some()
            || exif.get_field(exif::Tag::Model, exif::In::PRIMARY).is_some(),
    )
}

/// Greedy first-fit grouping in identity order: an image joins the first
/// group whose founding member is within `max_distance`, else founds its
/// own. Groups of one are not reported.
fn group_duplicates(samples: &[PhotoSample], max_distance: u32) -> Vec<DuplicateGroup> {
    let mut representatives: Vec<Fingerprint> = Vec::new();
    let mut members: Vec<Vec<&PhotoSample>> = Vec::new();

    for sample in samples {
        let Some(fp) = sample.fingerprint else { continue };

        let joined = representatives
            .iter()
            .position(|rep| rep.distance(&fp) <= max_distance);

        match joined {
            Some(idx) => members[idx].push(sample),
            None => {
                representatives.push(fp);
                members.push(vec![sample]);
            }
        }
    }

    members
        .into_iter()
        .filter(|group| group.len() > 1)
        .map(|mut group| {
            group.sort_by(|a, b| {
                let a_key = (a.asset_date.unwrap_or(DateTime::<Utc>::MAX_UTC), &a.identity);
                let b_key = (b.asset_date.unwrap_or(DateTime::<Utc>::MAX_UTC), &b.identity);
                a_key.cmp(&b_key)
            });
            let canonical = group[0].identity.clone();
            let duplicates = group[1..].iter().map(|s| s.identity.clone()).collect();
            DuplicateGroup { canonical, duplicates }
        })
        .collect()
}
