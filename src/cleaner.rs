//! Per-field coercion and repair of raw datasets.
//!
//! Deterministic coercion runs row-parallel. Category repair is the only
//! step that draws randomness and runs as one sequential column-major pass so
//! a given seed always assigns the same labels to the same rows.

use indexmap::IndexSet;
use rand::Rng;
use rand::seq::IndexedRandom;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::constants::labels::CITY;
use crate::data::{
    CleanDataset, CleanRecord, CleanValue, Domain, RawDataset, RawRecord, RawValue, Season,
};
use crate::schema::{Bounds, FieldKind, FieldSpec};
use crate::timestamps::{parse_timestamp, season_of};

static MISSING: RawValue = RawValue::Null;

/// Counters describing what one cleaning pass did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Domain cleaned.
    pub domain: Domain,
    /// Raw rows received.
    pub rows_in: usize,
    /// Exact-duplicate raw rows removed before coercion.
    pub duplicates_removed: usize,
    /// Rows whose timestamp was missing or unparsable.
    pub timestamps_unset: usize,
    /// Measurement cells holding a value that is not a number.
    pub non_numeric_nulled: usize,
    /// Measurements clipped to their bounds.
    pub values_clipped: usize,
    /// Invalid category labels replaced by a valid one.
    pub categories_resampled: usize,
    /// Seasons derived from the timestamp instead of the raw label.
    pub seasons_backfilled: usize,
    /// Rows removed because a critical field was missing.
    pub dropped_missing_critical: usize,
    /// Distinct raw rows that became identical once repaired.
    pub repaired_duplicates_removed: usize,
    /// Rows in the cleaned dataset.
    pub rows_out: usize,
}

impl CleaningReport {
    fn new(domain: Domain, rows_in: usize) -> Self {
        Self {
            domain,
            rows_in,
            duplicates_removed: 0,
            timestamps_unset: 0,
            non_numeric_nulled: 0,
            values_clipped: 0,
            categories_resampled: 0,
            seasons_backfilled: 0,
            dropped_missing_critical: 0,
            repaired_duplicates_removed: 0,
            rows_out: 0,
        }
    }
}

/// Cleaned dataset plus the report of how it was produced.
#[derive(Clone, Debug)]
pub struct CleanOutcome {
    /// Cleaned rows.
    pub dataset: CleanDataset,
    /// What the stage did.
    pub report: CleaningReport,
}

#[derive(Clone, Copy, Debug, Default)]
struct CoercionStats {
    timestamps_unset: usize,
    non_numeric_nulled: usize,
    values_clipped: usize,
    seasons_backfilled: usize,
}

impl CoercionStats {
    fn merge(mut self, other: Self) -> Self {
        self.timestamps_unset += other.timestamps_unset;
        self.non_numeric_nulled += other.non_numeric_nulled;
        self.values_clipped += other.values_clipped;
        self.seasons_backfilled += other.seasons_backfilled;
        self
    }
}

/// Clean `raw`, drawing replacement category labels from `rng`.
///
/// Steps run in a fixed order: exact-row dedup, timestamp and measurement
/// coercion with clipping, city and season canonicalization, uniform category
/// resampling, critical-field filtering, and a final dedup of rows that only
/// became identical after repair.
pub fn clean_dataset<R: Rng + ?Sized>(raw: &RawDataset, rng: &mut R) -> CleanOutcome {
    let domain = raw.domain;
    let schema = domain.schema();
    let mut report = CleaningReport::new(domain, raw.len());

    let unique: IndexSet<&RawRecord> = raw.records.iter().collect();
    report.duplicates_removed = raw.len() - unique.len();

    let coerced: Vec<(CleanRecord, CoercionStats)> = unique
        .into_iter()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|record| coerce_record(schema, record))
        .collect();
    let mut stats = CoercionStats::default();
    let mut records = Vec::with_capacity(coerced.len());
    for (record, record_stats) in coerced {
        stats = stats.merge(record_stats);
        records.push(record);
    }
    report.timestamps_unset = stats.timestamps_unset;
    report.non_numeric_nulled = stats.non_numeric_nulled;
    report.values_clipped = stats.values_clipped;
    report.seasons_backfilled = stats.seasons_backfilled;

    report.categories_resampled = resample_categories(schema, &mut records, rng);

    let before_filter = records.len();
    records.retain(|record| has_critical_fields(schema, record));
    report.dropped_missing_critical = before_filter - records.len();

    let before_sweep = records.len();
    let records: Vec<CleanRecord> = records.into_iter().collect::<IndexSet<_>>().into_iter().collect();
    report.repaired_duplicates_removed = before_sweep - records.len();
    report.rows_out = records.len();

    if report.repaired_duplicates_removed > 0 {
        debug!(
            "[wxtraffic:clean] {}: {} rows collapsed after repair",
            domain, report.repaired_duplicates_removed
        );
    }
    info!(
        "[wxtraffic:clean] {}: rows_in={} duplicates_removed={} dropped_missing_critical={} rows_out={}",
        domain,
        report.rows_in,
        report.duplicates_removed,
        report.dropped_missing_critical,
        report.rows_out
    );

    CleanOutcome {
        dataset: CleanDataset { domain, records },
        report,
    }
}

/// Deterministic per-row coercion. Category cells outside the valid set are
/// left null for the sequential resampling pass.
fn coerce_record(schema: &[FieldSpec], record: &RawRecord) -> (CleanRecord, CoercionStats) {
    let mut stats = CoercionStats::default();
    let mut timestamp = None;
    let mut values = Vec::with_capacity(schema.len());
    for (idx, field) in schema.iter().enumerate() {
        let raw = record.values.get(idx).unwrap_or(&MISSING);
        let value = match field.kind {
            FieldKind::Identifier => coerce_identifier(raw),
            FieldKind::Timestamp => match raw_text(raw).and_then(parse_timestamp) {
                Some(ts) => {
                    timestamp = Some(ts);
                    CleanValue::Timestamp(ts)
                }
                None => {
                    stats.timestamps_unset += 1;
                    CleanValue::Null
                }
            },
            FieldKind::City => CleanValue::Text(CITY.to_string()),
            // Backfilled below once the timestamp column has been seen.
            FieldKind::Season => match raw_text(raw).and_then(Season::parse) {
                Some(season) => CleanValue::Text(season.as_str().to_string()),
                None => CleanValue::Null,
            },
            FieldKind::Measurement(bounds) => coerce_measurement(raw, bounds, &mut stats),
            FieldKind::Category(valid) => match raw_text(raw) {
                Some(label) if valid.contains(&label) => CleanValue::Text(label.to_string()),
                _ => CleanValue::Null,
            },
        };
        values.push(value);
    }

    for (field, value) in schema.iter().zip(values.iter_mut()) {
        if matches!(field.kind, FieldKind::Season) && value.is_null() {
            if let Some(ts) = timestamp.as_ref() {
                *value = CleanValue::Text(season_of(ts).as_str().to_string());
                stats.seasons_backfilled += 1;
            }
        }
    }

    (CleanRecord { values }, stats)
}

fn raw_text(raw: &RawValue) -> Option<&str> {
    match raw {
        RawValue::Text(text) => Some(text.as_str()),
        _ => None,
    }
}

fn coerce_identifier(raw: &RawValue) -> CleanValue {
    match raw {
        RawValue::Int(value) => CleanValue::Int(*value),
        RawValue::Float(value) if value.is_finite() && value.fract() == 0.0 => {
            CleanValue::Int(*value as i64)
        }
        RawValue::Text(text) => text
            .trim()
            .parse::<i64>()
            .map(CleanValue::Int)
            .unwrap_or(CleanValue::Null),
        _ => CleanValue::Null,
    }
}

fn coerce_measurement(raw: &RawValue, bounds: Bounds, stats: &mut CoercionStats) -> CleanValue {
    let parsed = match raw {
        RawValue::Null => return CleanValue::Null,
        RawValue::Int(value) => Some(*value as f64),
        RawValue::Float(value) => Some(*value),
        RawValue::Text(text) => text.trim().parse::<f64>().ok(),
    };
    match parsed.filter(|value| value.is_finite()) {
        Some(value) => {
            let clipped = bounds.clip(value);
            if clipped != value {
                stats.values_clipped += 1;
            }
            CleanValue::Float(clipped)
        }
        None => {
            stats.non_numeric_nulled += 1;
            CleanValue::Null
        }
    }
}

/// Replace every null category cell with a uniformly drawn valid label.
///
/// Column-major: all rows of the first category column draw before any row
/// of the next one.
fn resample_categories<R: Rng + ?Sized>(
    schema: &[FieldSpec],
    records: &mut [CleanRecord],
    rng: &mut R,
) -> usize {
    let mut resampled = 0;
    for (idx, field) in schema.iter().enumerate() {
        let FieldKind::Category(valid) = field.kind else {
            continue;
        };
        for record in records.iter_mut() {
            let Some(value) = record.values.get_mut(idx) else {
                continue;
            };
            if value.is_null() {
                if let Some(label) = valid.choose(rng) {
                    *value = CleanValue::Text((*label).to_string());
                    resampled += 1;
                }
            }
        }
    }
    resampled
}

fn has_critical_fields(schema: &[FieldSpec], record: &CleanRecord) -> bool {
    schema
        .iter()
        .zip(&record.values)
        .all(|(field, value)| !field.critical || !value.is_null())
}
