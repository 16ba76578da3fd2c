//! Declarative per-field rule tables for the weather and traffic schemas.
//!
//! Each domain is a static slice of `FieldSpec` entries in raw column order.
//! Generator, cleaner, codecs, and merge plan all dispatch on these tables
//! instead of branching per field.

use std::collections::HashSet;

use serde::Serialize;

use crate::constants::{bounds, columns, labels};
use crate::errors::PipelineError;

/// Inclusive physical-domain interval for a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    /// Lower clip bound.
    pub min: f64,
    /// Upper clip bound.
    pub max: f64,
}

impl Bounds {
    /// Create an interval; validity is checked by `validate_schema`.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the interval.
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// True when `value` lies inside the interval (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Semantic type of a field, which selects its cleaning policy.
#[derive(Clone, Copy, Debug)]
pub enum FieldKind {
    /// Integer record identifier; collisions allowed.
    Identifier,
    /// Observation time; unparsable values become unset.
    Timestamp,
    /// City name; forced to the single-city constant.
    City,
    /// Season label; backfilled from the timestamp month.
    Season,
    /// Numeric measurement clipped to the given bounds.
    Measurement(Bounds),
    /// Categorical label restricted to the given valid set.
    Category(&'static [&'static str]),
}

impl FieldKind {
    /// Storage column type used by the columnar codecs.
    pub fn column_type(&self) -> ColumnType {
        match self {
            FieldKind::Identifier => ColumnType::Int64,
            FieldKind::Timestamp => ColumnType::TimestampMillis,
            FieldKind::Measurement(_) => ColumnType::Double,
            FieldKind::City | FieldKind::Season | FieldKind::Category(_) => ColumnType::Utf8,
        }
    }
}

/// Physical column type in clean and merged tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Signed 64-bit integer.
    Int64,
    /// Milliseconds since the epoch, no time zone.
    TimestampMillis,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    Utf8,
}

/// One named field in a domain schema.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    /// Column name.
    pub name: &'static str,
    /// Cleaning policy selector.
    pub kind: FieldKind,
    /// Rows missing this field are dropped by the cleaner.
    pub critical: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            critical: false,
        }
    }

    const fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// Name and storage type of a column in a clean or merged table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub column_type: ColumnType,
}

/// Weather raw schema, in column order.
pub const WEATHER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(columns::WEATHER_ID, FieldKind::Identifier),
    FieldSpec::new(columns::DATE_TIME, FieldKind::Timestamp).critical(),
    FieldSpec::new(columns::CITY, FieldKind::City),
    FieldSpec::new(columns::SEASON, FieldKind::Season),
    FieldSpec::new(columns::TEMPERATURE_C, FieldKind::Measurement(bounds::TEMPERATURE_C)).critical(),
    FieldSpec::new(columns::HUMIDITY, FieldKind::Measurement(bounds::HUMIDITY)),
    FieldSpec::new(columns::RAIN_MM, FieldKind::Measurement(bounds::RAIN_MM)),
    FieldSpec::new(columns::WIND_SPEED_KMH, FieldKind::Measurement(bounds::WIND_SPEED_KMH)),
    FieldSpec::new(columns::VISIBILITY_M, FieldKind::Measurement(bounds::WEATHER_VISIBILITY_M)),
    FieldSpec::new(columns::WEATHER_CONDITION, FieldKind::Category(&labels::WEATHER_CONDITIONS)),
    FieldSpec::new(columns::AIR_PRESSURE_HPA, FieldKind::Measurement(bounds::AIR_PRESSURE_HPA)),
];

/// Traffic raw schema, in column order.
pub const TRAFFIC_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(columns::TRAFFIC_ID, FieldKind::Identifier),
    FieldSpec::new(columns::DATE_TIME, FieldKind::Timestamp).critical(),
    FieldSpec::new(columns::CITY, FieldKind::City),
    FieldSpec::new(columns::AREA, FieldKind::Category(&labels::AREAS)).critical(),
    FieldSpec::new(columns::VEHICLE_COUNT, FieldKind::Measurement(bounds::VEHICLE_COUNT)).critical(),
    FieldSpec::new(columns::AVG_SPEED_KMH, FieldKind::Measurement(bounds::AVG_SPEED_KMH)),
    FieldSpec::new(columns::ACCIDENT_COUNT, FieldKind::Measurement(bounds::ACCIDENT_COUNT)),
    FieldSpec::new(columns::CONGESTION_LEVEL, FieldKind::Category(&labels::CONGESTION_LEVELS)),
    FieldSpec::new(columns::ROAD_CONDITION, FieldKind::Category(&labels::ROAD_CONDITIONS)),
    FieldSpec::new(columns::VISIBILITY_M, FieldKind::Measurement(bounds::TRAFFIC_VISIBILITY_M)),
];

/// Position of `name` within `schema`.
pub fn field_index(schema: &[FieldSpec], name: &str) -> Option<usize> {
    schema.iter().position(|field| field.name == name)
}

/// Column specs for a domain schema, in order.
pub fn column_specs(schema: &[FieldSpec]) -> Vec<ColumnSpec> {
    schema
        .iter()
        .map(|field| ColumnSpec {
            name: field.name,
            column_type: field.kind.column_type(),
        })
        .collect()
}

/// Reject schemas whose bounds or label sets are internally inconsistent.
pub fn validate_schema(schema: &[FieldSpec]) -> Result<(), PipelineError> {
    let mut names = HashSet::new();
    for field in schema {
        if !names.insert(field.name) {
            return Err(PipelineError::Configuration(format!(
                "column '{}' is declared twice",
                field.name
            )));
        }
        match field.kind {
            FieldKind::Measurement(bounds) => {
                if !bounds.min.is_finite() || !bounds.max.is_finite() || bounds.min >= bounds.max {
                    return Err(PipelineError::Configuration(format!(
                        "column '{}' has an empty or non-finite bound interval [{}, {}]",
                        field.name, bounds.min, bounds.max
                    )));
                }
            }
            FieldKind::Category(valid) => {
                if valid.is_empty() {
                    return Err(PipelineError::Configuration(format!(
                        "column '{}' has an empty valid-label set",
                        field.name
                    )));
                }
                let unique: HashSet<&str> = valid.iter().copied().collect();
                if unique.len() != valid.len() {
                    return Err(PipelineError::Configuration(format!(
                        "column '{}' repeats a valid label",
                        field.name
                    )));
                }
            }
            FieldKind::Identifier | FieldKind::Timestamp | FieldKind::City | FieldKind::Season => {}
        }
    }
    let timestamps = schema
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Timestamp))
        .count();
    if timestamps != 1 {
        return Err(PipelineError::Configuration(format!(
            "schema must declare exactly one timestamp column, found {timestamps}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_schemas_are_consistent() {
        validate_schema(WEATHER_FIELDS).expect("weather schema");
        validate_schema(TRAFFIC_FIELDS).expect("traffic schema");
    }

    #[test]
    fn raw_column_orders_match_artifact_headers() {
        let weather: Vec<&str> = WEATHER_FIELDS.iter().map(|field| field.name).collect();
        assert_eq!(
            weather,
            vec![
                "weather_id",
                "date_time",
                "city",
                "season",
                "temperature_c",
                "humidity",
                "rain_mm",
                "wind_speed_kmh",
                "visibility_m",
                "weather_condition",
                "air_pressure_hpa",
            ]
        );
        let traffic: Vec<&str> = TRAFFIC_FIELDS.iter().map(|field| field.name).collect();
        assert_eq!(
            traffic,
            vec![
                "traffic_id",
                "date_time",
                "city",
                "area",
                "vehicle_count",
                "avg_speed_kmh",
                "accident_count",
                "congestion_level",
                "road_condition",
                "visibility_m",
            ]
        );
    }

    #[test]
    fn critical_fields_match_domain_rules() {
        let weather: Vec<&str> = WEATHER_FIELDS
            .iter()
            .filter(|field| field.critical)
            .map(|field| field.name)
            .collect();
        assert_eq!(weather, vec!["date_time", "temperature_c"]);
        let traffic: Vec<&str> = TRAFFIC_FIELDS
            .iter()
            .filter(|field| field.critical)
            .map(|field| field.name)
            .collect();
        assert_eq!(traffic, vec!["date_time", "area", "vehicle_count"]);
    }

    #[test]
    fn validation_rejects_inverted_bounds_and_empty_labels() {
        const INVERTED: &[FieldSpec] = &[
            FieldSpec::new("date_time", FieldKind::Timestamp),
            FieldSpec::new("x", FieldKind::Measurement(Bounds::new(5.0, 1.0))),
        ];
        assert!(matches!(
            validate_schema(INVERTED),
            Err(PipelineError::Configuration(_))
        ));

        const EMPTY: &[FieldSpec] = &[
            FieldSpec::new("date_time", FieldKind::Timestamp),
            FieldSpec::new("label", FieldKind::Category(&[])),
        ];
        assert!(matches!(
            validate_schema(EMPTY),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn bounds_clip_to_either_edge() {
        let bounds = Bounds::new(-10.0, 40.0);
        assert_eq!(bounds.clip(100.0), 40.0);
        assert_eq!(bounds.clip(-30.0), -10.0);
        assert_eq!(bounds.clip(12.5), 12.5);
        assert!(bounds.contains(40.0));
        assert!(!bounds.contains(40.1));
    }
}
