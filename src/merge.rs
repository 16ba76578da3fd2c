//! Hour-bucket join of cleaned weather and traffic datasets.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CollisionPolicy;
use crate::constants::columns;
use crate::data::{CleanDataset, CleanRecord, CleanValue, Domain, MergedDataset};
use crate::errors::PipelineError;
use crate::schema::{ColumnSpec, FieldKind, FieldSpec, TRAFFIC_FIELDS, WEATHER_FIELDS, field_index};
use crate::timestamps::hour_floor;

/// Which merge input a column is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Side {
    /// Weather input.
    Weather,
    /// Traffic input.
    Traffic,
}

/// Precedence for columns present in both inputs.
pub const COLLISION_RULES: &[(&str, Side)] = &[
    (columns::CITY, Side::Weather),
    (columns::DATE_TIME, Side::Weather),
    (columns::VISIBILITY_M, Side::Weather),
];

/// A shared column and the side whose value survives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedCollision {
    /// Shared column name.
    pub column: &'static str,
    /// Side whose value is projected.
    pub kept: Side,
    /// False when the column had no rule and the policy fallback applied.
    pub listed: bool,
}

#[derive(Clone, Copy, Debug)]
struct ColumnSource {
    spec: ColumnSpec,
    side: Side,
    index: usize,
}

/// Column-by-column projection from the two inputs to the output schema.
///
/// Built once before any row is touched, so unresolvable schemas fail early.
#[derive(Clone, Debug)]
pub struct MergePlan {
    sources: Vec<ColumnSource>,
    collisions: Vec<ResolvedCollision>,
    weather_key: (usize, usize),
    traffic_key: (usize, usize),
}

impl MergePlan {
    /// Plan for the domain schemas and the fixed merged column list.
    pub fn standard(policy: CollisionPolicy) -> Result<Self, PipelineError> {
        Self::build(WEATHER_FIELDS, TRAFFIC_FIELDS, &columns::MERGED, policy)
    }

    /// Resolve every shared column, then map each output column to a source.
    pub fn build(
        weather: &[FieldSpec],
        traffic: &[FieldSpec],
        output: &[&'static str],
        policy: CollisionPolicy,
    ) -> Result<Self, PipelineError> {
        let traffic_names: HashSet<&str> = traffic.iter().map(|field| field.name).collect();
        let mut collisions = Vec::new();
        for field in weather.iter().filter(|field| traffic_names.contains(field.name)) {
            let rule = COLLISION_RULES
                .iter()
                .find(|(name, _)| *name == field.name)
                .map(|(_, side)| *side);
            let resolved = match (rule, policy) {
                (Some(side), _) => ResolvedCollision {
                    column: field.name,
                    kept: side,
                    listed: true,
                },
                (None, CollisionPolicy::Strict) => {
                    return Err(PipelineError::SchemaCollision {
                        column: field.name.to_string(),
                    });
                }
                (None, CollisionPolicy::PreferWeather) => {
                    warn!(
                        "[wxtraffic:merge] column '{}' is shared by both inputs without a rule; keeping weather value",
                        field.name
                    );
                    ResolvedCollision {
                        column: field.name,
                        kept: Side::Weather,
                        listed: false,
                    }
                }
            };
            collisions.push(resolved);
        }

        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(output.len());
        for name in output {
            if !seen.insert(*name) {
                return Err(PipelineError::Configuration(format!(
                    "output column '{name}' is listed twice"
                )));
            }
            let preferred = collisions
                .iter()
                .find(|collision| collision.column == *name)
                .map(|collision| collision.kept);
            let candidates = match preferred {
                Some(Side::Weather) | None => [(Side::Weather, weather), (Side::Traffic, traffic)],
                Some(Side::Traffic) => [(Side::Traffic, traffic), (Side::Weather, weather)],
            };
            let source = candidates.iter().find_map(|(side, schema)| {
                let index = field_index(schema, name)?;
                Some(ColumnSource {
                    spec: ColumnSpec {
                        name: schema[index].name,
                        column_type: schema[index].kind.column_type(),
                    },
                    side: *side,
                    index,
                })
            });
            match source {
                Some(source) => sources.push(source),
                None => {
                    return Err(PipelineError::Configuration(format!(
                        "output column '{name}' is provided by neither input"
                    )));
                }
            }
        }

        Ok(Self {
            sources,
            collisions,
            weather_key: join_key_indices(weather, "weather")?,
            traffic_key: join_key_indices(traffic, "traffic")?,
        })
    }

    /// Output columns, in order.
    pub fn columns(&self) -> Vec<ColumnSpec> {
        self.sources.iter().map(|source| source.spec).collect()
    }

    /// Shared columns and how each was resolved.
    pub fn collisions(&self) -> &[ResolvedCollision] {
        &self.collisions
    }

    fn project(&self, weather: &CleanRecord, traffic: &CleanRecord) -> CleanRecord {
        let values = self
            .sources
            .iter()
            .map(|source| {
                let record = match source.side {
                    Side::Weather => weather,
                    Side::Traffic => traffic,
                };
                record
                    .values
                    .get(source.index)
                    .cloned()
                    .unwrap_or(CleanValue::Null)
            })
            .collect();
        CleanRecord { values }
    }
}

fn join_key_indices(schema: &[FieldSpec], label: &str) -> Result<(usize, usize), PipelineError> {
    let timestamp = schema
        .iter()
        .position(|field| matches!(field.kind, FieldKind::Timestamp));
    let city = schema
        .iter()
        .position(|field| matches!(field.kind, FieldKind::City));
    match (timestamp, city) {
        (Some(timestamp), Some(city)) => Ok((timestamp, city)),
        _ => Err(PipelineError::Configuration(format!(
            "{label} schema lacks a timestamp or city column for the join key"
        ))),
    }
}

type JoinKey = (NaiveDateTime, String);

fn join_key(record: &CleanRecord, (timestamp, city): (usize, usize)) -> Option<JoinKey> {
    let ts = record.values.get(timestamp)?.as_timestamp()?;
    let city = record.values.get(city)?.as_str()?;
    Some((hour_floor(ts), city.to_string()))
}

/// Counters describing one merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Weather rows joined.
    pub weather_rows: usize,
    /// Traffic rows joined.
    pub traffic_rows: usize,
    /// Distinct (hour, city) keys present on both sides.
    pub matched_keys: usize,
    /// Output rows.
    pub rows_out: usize,
    /// How each shared column was resolved.
    pub collisions: Vec<ResolvedCollision>,
}

/// Merged dataset plus its report.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    /// Joined rows.
    pub dataset: MergedDataset,
    /// What the stage did.
    pub report: MergeReport,
}

/// Inner hash join on (hour floor, city), projected through `plan`.
///
/// The traffic side is indexed and weather rows probe it in order, so output
/// follows weather order and then traffic order within a key. Keys repeated
/// on both sides produce their cross-product.
pub fn merge(
    weather: &CleanDataset,
    traffic: &CleanDataset,
    plan: &MergePlan,
) -> Result<MergeOutcome, PipelineError> {
    if weather.domain != Domain::Weather || traffic.domain != Domain::Traffic {
        return Err(PipelineError::Configuration(format!(
            "merge expects weather and traffic inputs, got {} and {}",
            weather.domain, traffic.domain
        )));
    }

    let mut index: HashMap<JoinKey, Vec<&CleanRecord>> = HashMap::new();
    for record in &traffic.records {
        if let Some(key) = join_key(record, plan.traffic_key) {
            index.entry(key).or_default().push(record);
        }
    }

    let mut matched = HashSet::new();
    let mut records = Vec::new();
    for record in &weather.records {
        let Some(key) = join_key(record, plan.weather_key) else {
            continue;
        };
        if let Some(partners) = index.get(&key) {
            for partner in partners {
                records.push(plan.project(record, partner));
            }
            matched.insert(key);
        }
    }

    let report = MergeReport {
        weather_rows: weather.len(),
        traffic_rows: traffic.len(),
        matched_keys: matched.len(),
        rows_out: records.len(),
        collisions: plan.collisions().to_vec(),
    };
    info!(
        "[wxtraffic:merge] weather_rows={} traffic_rows={} matched_keys={} rows_out={}",
        report.weather_rows, report.traffic_rows, report.matched_keys, report.rows_out
    );
    Ok(MergeOutcome {
        dataset: MergedDataset {
            columns: plan.columns(),
            records,
        },
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::labels::CITY;
    use crate::schema::Bounds;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn text(value: &str) -> CleanValue {
        CleanValue::Text(value.to_string())
    }

    fn weather_record(ts: NaiveDateTime, temperature: f64, visibility: f64) -> CleanRecord {
        CleanRecord {
            values: vec![
                CleanValue::Int(5001),
                CleanValue::Timestamp(ts),
                text(CITY),
                text("Winter"),
                CleanValue::Float(temperature),
                CleanValue::Float(85.0),
                CleanValue::Float(1.5),
                CleanValue::Float(12.0),
                CleanValue::Float(visibility),
                text("Fog"),
                CleanValue::Float(1001.0),
            ],
        }
    }

    fn traffic_record(ts: NaiveDateTime, vehicles: f64) -> CleanRecord {
        CleanRecord {
            values: vec![
                CleanValue::Int(9001),
                CleanValue::Timestamp(ts),
                text(CITY),
                text("Camden"),
                CleanValue::Float(vehicles),
                CleanValue::Float(35.0),
                CleanValue::Float(1.0),
                text("Medium"),
                text("Wet"),
                CleanValue::Float(300.0),
            ],
        }
    }

    fn dataset(domain: Domain, records: Vec<CleanRecord>) -> CleanDataset {
        CleanDataset { domain, records }
    }

    fn standard() -> MergePlan {
        MergePlan::standard(CollisionPolicy::PreferWeather).unwrap()
    }

    #[test]
    fn output_schema_is_fixed_list() {
        let names: Vec<&str> = standard().columns().iter().map(|spec| spec.name).collect();
        assert_eq!(
            names,
            vec![
                "date_time",
                "city",
                "season",
                "temperature_c",
                "humidity",
                "rain_mm",
                "wind_speed_kmh",
                "weather_condition",
                "air_pressure_hpa",
                "area",
                "vehicle_count",
                "avg_speed_kmh",
                "accident_count",
                "congestion_level",
                "road_condition",
                "visibility_m",
            ]
        );
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn shared_columns_resolve_to_weather() {
        let plan = standard();
        let kept: Vec<(&str, Side)> = plan
            .collisions()
            .iter()
            .map(|collision| (collision.column, collision.kept))
            .collect();
        assert_eq!(
            kept,
            vec![
                ("date_time", Side::Weather),
                ("city", Side::Weather),
                ("visibility_m", Side::Weather),
            ]
        );
        assert!(plan.collisions().iter().all(|collision| collision.listed));
    }

    #[test]
    fn same_hour_rows_join_once() {
        let weather = dataset(Domain::Weather, vec![weather_record(at(8, 0), 6.5, 2500.0)]);
        let traffic = dataset(Domain::Traffic, vec![traffic_record(at(8, 42), 3100.0)]);
        let outcome = merge(&weather, &traffic, &standard()).unwrap();
        let merged = &outcome.dataset;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.value(0, "temperature_c"), Some(&CleanValue::Float(6.5)));
        assert_eq!(merged.value(0, "visibility_m"), Some(&CleanValue::Float(2500.0)));
        assert_eq!(merged.value(0, "vehicle_count"), Some(&CleanValue::Float(3100.0)));
        assert_eq!(merged.value(0, "date_time"), Some(&CleanValue::Timestamp(at(8, 0))));
        assert_eq!(outcome.report.matched_keys, 1);
    }

    #[test]
    fn disjoint_or_empty_inputs_yield_zero_rows() {
        let weather = dataset(Domain::Weather, vec![weather_record(at(1, 0), 3.0, 900.0)]);
        let traffic = dataset(Domain::Traffic, vec![traffic_record(at(2, 5), 500.0)]);
        let plan = standard();
        let outcome = merge(&weather, &traffic, &plan).unwrap();
        assert!(outcome.dataset.is_empty());
        assert_eq!(outcome.dataset.column_names().len(), 16);

        let empty = CleanDataset::empty(Domain::Traffic);
        assert!(merge(&weather, &empty, &plan).unwrap().dataset.is_empty());
    }

    #[test]
    fn row_count_bounded_by_shared_keys_with_unique_rows() {
        let weather = dataset(
            Domain::Weather,
            (0..6).map(|h| weather_record(at(h, 0), 1.0 + h as f64, 1000.0)).collect(),
        );
        let traffic = dataset(
            Domain::Traffic,
            (3..10).map(|h| traffic_record(at(h, 30), 100.0 * h as f64)).collect(),
        );
        let outcome = merge(&weather, &traffic, &standard()).unwrap();
        assert_eq!(outcome.report.matched_keys, 3);
        assert!(outcome.dataset.len() <= outcome.report.matched_keys);
        assert_eq!(outcome.dataset.len(), 3);
    }

    #[test]
    fn repeated_keys_produce_cross_product() {
        let weather = dataset(
            Domain::Weather,
            vec![weather_record(at(8, 0), 1.0, 800.0), weather_record(at(8, 0), 2.0, 800.0)],
        );
        let traffic = dataset(
            Domain::Traffic,
            vec![
                traffic_record(at(8, 10), 10.0),
                traffic_record(at(8, 20), 20.0),
                traffic_record(at(8, 30), 30.0),
            ],
        );
        let outcome = merge(&weather, &traffic, &standard()).unwrap();
        assert_eq!(outcome.dataset.len(), 6);
        assert_eq!(outcome.report.matched_keys, 1);
        let first: Vec<Option<f64>> = (0..3)
            .map(|row| outcome.dataset.value(row, "vehicle_count").and_then(CleanValue::as_f64))
            .collect();
        assert_eq!(first, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn unlisted_collision_follows_policy() {
        const WEATHER: &[FieldSpec] = &[
            FieldSpec {
                name: "date_time",
                kind: FieldKind::Timestamp,
                critical: true,
            },
            FieldSpec {
                name: "city",
                kind: FieldKind::City,
                critical: false,
            },
            FieldSpec {
                name: "wind_gust",
                kind: FieldKind::Measurement(Bounds::new(0.0, 200.0)),
                critical: false,
            },
        ];
        let output = ["date_time", "city", "wind_gust"];

        let strict = MergePlan::build(WEATHER, WEATHER, &output, CollisionPolicy::Strict);
        assert!(matches!(
            strict,
            Err(PipelineError::SchemaCollision { ref column }) if column == "wind_gust"
        ));

        let lenient =
            MergePlan::build(WEATHER, WEATHER, &output, CollisionPolicy::PreferWeather).unwrap();
        let gust = lenient
            .collisions()
            .iter()
            .find(|collision| collision.column == "wind_gust")
            .unwrap();
        assert_eq!(gust.kept, Side::Weather);
        assert!(!gust.listed);
    }

    #[test]
    fn unknown_output_column_is_configuration_error() {
        let result = MergePlan::build(
            WEATHER_FIELDS,
            TRAFFIC_FIELDS,
            &["date_time", "dew_point"],
            CollisionPolicy::PreferWeather,
        );
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn swapped_inputs_are_rejected() {
        let weather = CleanDataset::empty(Domain::Weather);
        let traffic = CleanDataset::empty(Domain::Traffic);
        assert!(merge(&traffic, &weather, &standard()).is_err());
    }
}
