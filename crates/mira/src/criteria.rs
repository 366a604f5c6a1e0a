//! Declarative deletion rules over the index.
//!
//! A rule is a pure predicate over an index entry plus "now": evaluable
//! without remote access, deterministic, and side-effect-free. The engine
//! only produces candidates; the deletion executor decides what happens to
//! them.

use crate::dates::age_years;
use crate::error::{MiraError, Result};
use crate::store::index::{IndexEntry, LibraryIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Videos at least `min_age_years` old and at least `min_size_mb` large.
    AgeAndSize { min_age_years: f64, min_size_mb: f64 },
    /// Videos at least `min_age_years` old and at most `max_duration_sec`
    /// long (accidental clips).
    AgeAndDuration { min_age_years: f64, max_duration_sec: f64 },
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::AgeAndSize { .. } => "age_and_size",
            Rule::AgeAndDuration { .. } => "age_and_duration",
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64, field: &str| {
            if value > 0.0 {
                Ok(())
            } else {
                Err(MiraError::Config(format!(
                    "{} must be positive in {} rule, got {}",
                    field,
                    self.name(),
                    value
                )))
            }
        };

        match self {
            Rule::AgeAndSize { min_age_years, min_size_mb } => {
                positive(*min_age_years, "min_age_years")?;
                positive(*min_size_mb, "min_size_mb")
            }
            Rule::AgeAndDuration { min_age_years, max_duration_sec } => {
                positive(*min_age_years, "min_age_years")?;
                positive(*max_duration_sec, "max_duration_sec")
            }
        }
    }

    /// Test this rule against an entry. Videos only; an entry without a
    /// resolvable date never matches.
    pub fn matches(&self, entry: &IndexEntry, now: DateTime<Utc>) -> Option<String> {
        if !entry.is_video() {
            return None;
        }
        let date = entry.resolved_date()?;
        let age = age_years(date, now)?;

        match self {
            Rule::AgeAndSize { min_age_years, min_size_mb } => {
                let size_mb = entry.size_bytes as f64 / 1e6;
                if age >= *min_age_years && size_mb >= *min_size_mb {
                    Some(format!("old large video: {:.1}yr, {:.1}MB", age, size_mb))
                } else {
                    None
                }
            }
            Rule::AgeAndDuration { min_age_years, max_duration_sec } => {
                let duration = entry.duration_seconds?;
                if age >= *min_age_years && duration <= *max_duration_sec {
                    Some(format!("old short video: {:.1}yr, {:.1}s", age, duration))
                } else {
                    None
                }
            }
        }
    }
}

/// Default criteria: videos older than 2 years and larger than 100MB, or
/// older than 1 year and shorter than 5 seconds.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::AgeAndSize { min_age_years: 2.0, min_size_mb: 100.0 },
        Rule::AgeAndDuration { min_age_years: 1.0, max_duration_sec: 5.0 },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionCandidate {
    pub identity: String,
    pub matched_rule: String,
    pub reason: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateReport {
    pub candidates: Vec<DeletionCandidate>,
}

impl CandidateReport {
    /// Total size, each entry counted once.
    pub fn total_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.size_bytes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Evaluate every rule against every entry, in identity order. An entry is
/// reported at most once, for the first rule that matches it.
pub fn evaluate(index: &LibraryIndex, rules: &[Rule], now: DateTime<Utc>) -> CandidateReport {
    let mut report = CandidateReport::default();

    for entry in index.scan() {
        for rule in rules {
            if let Some(reason) = rule.matches(entry, now) {
                report.candidates.push(DeletionCandidate {
                    identity: entry.identity.clone(),
                    matched_rule: rule.name().to_string(),
                    reason,
                    size_bytes: entry.size_bytes,
                });
                break;
            }
        }
    }

    report
}
