//! Craving statistics over a trailing window.
//!
//! The calculator is pure: callers load the entries and hand them in,
//! which keeps it usable both from the engine and from repair paths.

use crate::{CravingEntry, CravingStats};
use chrono::{DateTime, Duration, Utc};

/// Default lookback for craving statistics, in days
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Select the entries created strictly after `now - days`, oldest first.
///
/// A cutoff outside chrono's date range keeps every entry.
pub fn window(entries: &[CravingEntry], now: DateTime<Utc>, days: i64) -> Vec<&CravingEntry> {
    let cutoff = Duration::try_days(days).and_then(|span| now.checked_sub_signed(span));
    let mut selected: Vec<_> = entries
        .iter()
        .filter(|e| cutoff.map_or(true, |cutoff| e.created_at > cutoff))
        .collect();
    selected.sort_by_key(|e| e.created_at);
    selected
}

/// Compute the average intensity and first-half/second-half trend.
///
/// `entries` must be ordered oldest first. The average is rounded to one
/// decimal, the trend to a whole percentage. An empty first half or a
/// zero first-half mean yields a trend of 0.
pub fn craving_stats<'a, I>(entries: I) -> CravingStats
where
    I: IntoIterator<Item = &'a CravingEntry>,
{
    let intensities: Vec<f64> = entries.into_iter().map(|e| f64::from(e.intensity)).collect();
    intensity_stats(&intensities)
}

fn intensity_stats(intensities: &[f64]) -> CravingStats {
    if intensities.is_empty() {
        return CravingStats::default();
    }

    let average = mean(intensities);

    let (first, second) = intensities.split_at(intensities.len() / 2);
    let first_avg = mean(first);
    let second_avg = mean(second);

    let trend = if first_avg > 0.0 {
        round_half_up((second_avg - first_avg) / first_avg * 100.0)
    } else {
        0.0
    };

    CravingStats {
        average: round_half_up(average * 10.0) / 10.0,
        trend,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// Halves round towards positive infinity, so -12.5 becomes -12.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
