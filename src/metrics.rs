use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::constants::columns;
use crate::data::{Domain, RawDataset, RawRecord, RawValue};
use crate::types::ColumnName;

/// Data-quality summary of one raw dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetProfile {
    /// Domain profiled.
    pub domain: Domain,
    /// Rows, duplicates included.
    pub rows: usize,
    /// Missing cells per column, in schema order.
    pub null_counts: IndexMap<ColumnName, usize>,
    /// Rows that exactly repeat an earlier row.
    pub duplicate_rows: usize,
    /// Domain-specific out-of-range counters.
    pub anomalies: IndexMap<String, usize>,
}

impl DatasetProfile {
    /// Fraction of rows with `column` missing; `None` for unknown columns.
    pub fn null_rate(&self, column: &str) -> Option<f64> {
        let nulls = *self.null_counts.get(column)?;
        if self.rows == 0 {
            return Some(0.0);
        }
        Some(nulls as f64 / self.rows as f64)
    }
}

/// Compute null, duplicate, and out-of-range counts for a raw dataset.
pub fn profile_dataset(dataset: &RawDataset) -> DatasetProfile {
    let schema = dataset.domain.schema();
    let mut null_counts: IndexMap<ColumnName, usize> =
        schema.iter().map(|field| (field.name.to_string(), 0)).collect();
    for record in &dataset.records {
        for (field, value) in schema.iter().zip(&record.values) {
            if value.is_null() {
                if let Some(count) = null_counts.get_mut(field.name) {
                    *count += 1;
                }
            }
        }
    }

    let mut seen: HashSet<&RawRecord> = HashSet::with_capacity(dataset.len());
    let duplicate_rows = dataset
        .records
        .iter()
        .filter(|record| !seen.insert(record))
        .count();

    let mut anomalies = IndexMap::new();
    match dataset.domain {
        Domain::Weather => {
            anomalies.insert(
                "temperature_outside_-10_50".to_string(),
                count_numeric(dataset, columns::TEMPERATURE_C, |t| !(-10.0..=50.0).contains(&t)),
            );
        }
        Domain::Traffic => {
            anomalies.insert(
                "negative_speed".to_string(),
                count_numeric(dataset, columns::AVG_SPEED_KMH, |speed| speed < 0.0),
            );
            anomalies.insert(
                "vehicle_count_above_20000".to_string(),
                count_numeric(dataset, columns::VEHICLE_COUNT, |count| count > 20000.0),
            );
        }
    }

    DatasetProfile {
        domain: dataset.domain,
        rows: dataset.len(),
        null_counts,
        duplicate_rows,
        anomalies,
    }
}

fn count_numeric(dataset: &RawDataset, column: &str, predicate: impl Fn(f64) -> bool) -> usize {
    dataset
        .column(column)
        .filter_map(|value| match value {
            RawValue::Int(value) => Some(*value as f64),
            RawValue::Float(value) => Some(*value),
            _ => None,
        })
        .filter(|value| predicate(*value))
        .count()
}
