//! Effective-date resolution shared by windowing and age-based rules.
//!
//! An item carries up to three timestamps. `added_date` reflects when the
//! remote learned about the item and is preferred for recency windowing;
//! the fallbacks guard against missing metadata without ever inventing a
//! date. An item with none of the three is excluded from every age-based
//! decision.

use chrono::{DateTime, Utc};

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Resolve an effective date by fallback order:
/// `added_date` -> `asset_date` -> `created_date`.
pub fn resolve_date(
    added_date: Option<DateTime<Utc>>,
    asset_date: Option<DateTime<Utc>>,
    created_date: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    added_date.or(asset_date).or(created_date)
}

/// Age in fractional years at `now`, or `None` for future-dated items.
pub fn age_years(date: DateTime<Utc>, now: DateTime<Utc>) -> Option<f64> {
    let days = (now - date).num_seconds() as f64 / 86_400.0;
    if days < 0.0 {
        return None;
    }
    Some(days / DAYS_PER_YEAR)
}

pub fn age_months(date: DateTime<Utc>, now: DateTime<Utc>) -> Option<f64> {
    age_years(date, now).map(|years| years * 12.0)
}
