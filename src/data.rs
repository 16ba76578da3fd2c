use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::constants::{columns, generator, labels, lake};
use crate::hash::stable_hash_with;
use crate::schema::{ColumnSpec, FieldSpec, TRAFFIC_FIELDS, WEATHER_FIELDS, field_index};
use crate::timestamps::{RENDER_FORMAT, format_timestamp};

/// Observation domain of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Hourly weather observations.
    Weather,
    /// Per-area traffic observations.
    Traffic,
}

impl Domain {
    /// Both domains, in the order the pipeline processes them.
    pub const ALL: [Domain; 2] = [Domain::Weather, Domain::Traffic];

    /// Lowercase domain name used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Weather => "weather",
            Domain::Traffic => "traffic",
        }
    }

    /// Raw schema (field rule table) for this domain.
    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            Domain::Weather => WEATHER_FIELDS,
            Domain::Traffic => TRAFFIC_FIELDS,
        }
    }

    /// Identifier column name.
    pub fn id_column(&self) -> &'static str {
        match self {
            Domain::Weather => columns::WEATHER_ID,
            Domain::Traffic => columns::TRAFFIC_ID,
        }
    }

    /// Offset added to the sequential index to form generated identifiers.
    pub fn id_offset(&self) -> i64 {
        match self {
            Domain::Weather => generator::WEATHER_ID_OFFSET,
            Domain::Traffic => generator::TRAFFIC_ID_OFFSET,
        }
    }

    /// Bronze-tier object name.
    pub fn raw_object(&self) -> &'static str {
        match self {
            Domain::Weather => lake::WEATHER_RAW,
            Domain::Traffic => lake::TRAFFIC_RAW,
        }
    }

    /// Silver-tier object name.
    pub fn clean_object(&self) -> &'static str {
        match self {
            Domain::Weather => lake::WEATHER_CLEAN,
            Domain::Traffic => lake::TRAFFIC_CLEAN,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meteorological season derived from the month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    /// December to February.
    Winter,
    /// March to May.
    Spring,
    /// June to August.
    Summer,
    /// September to November.
    Autumn,
}

impl Season {
    /// December through February is winter, and so on in three-month blocks.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Exact-match parse of a canonical season label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Winter" => Some(Season::Winter),
            "Spring" => Some(Season::Spring),
            "Summer" => Some(Season::Summer),
            "Autumn" => Some(Season::Autumn),
            _ => None,
        }
    }

    /// Canonical label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => labels::SEASONS[0],
            Season::Spring => labels::SEASONS[1],
            Season::Summer => labels::SEASONS[2],
            Season::Autumn => labels::SEASONS[3],
        }
    }
}

/// Bit pattern used for float equality and hashing; both zeros map to `+0.0`.
fn float_key(value: f64) -> u64 {
    (value + 0.0).to_bits()
}

/// A raw cell: whatever the generator (or a raw artifact) holds.
///
/// Floats compare and hash by bit pattern so full-row equality is total.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RawValue {
    /// Missing value.
    Null,
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Free text, including unparsable sentinels.
    Text(String),
}

impl RawValue {
    /// True for a missing cell.
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Decode a delimited-text cell: empty is null, then integer, finite float, text.
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            return RawValue::Null;
        }
        if let Ok(value) = cell.parse::<i64>() {
            return RawValue::Int(value);
        }
        match cell.parse::<f64>() {
            Ok(value) if value.is_finite() => RawValue::Float(value),
            _ => RawValue::Text(cell.to_string()),
        }
    }

    /// Encode as a delimited-text cell (inverse of `from_cell`).
    ///
    /// Floats use the shortest round-trip form and always keep a fraction or
    /// exponent, so `2.0` does not come back as an integer.
    pub fn to_cell(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Int(value) => value.to_string(),
            RawValue::Float(value) => format!("{value:?}"),
            RawValue::Text(value) => value.clone(),
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::Null, RawValue::Null) => true,
            (RawValue::Int(a), RawValue::Int(b)) => a == b,
            (RawValue::Float(a), RawValue::Float(b)) => float_key(*a) == float_key(*b),
            (RawValue::Text(a), RawValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for RawValue {}

impl Hash for RawValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RawValue::Null => {}
            RawValue::Int(value) => value.hash(state),
            RawValue::Float(value) => float_key(*value).hash(state),
            RawValue::Text(value) => value.hash(state),
        }
    }
}

/// One raw row: exactly one value per declared field, in schema order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    /// Cells in schema order.
    pub values: Vec<RawValue>,
}

/// Generator output for one domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDataset {
    /// Domain whose schema the rows follow.
    pub domain: Domain,
    /// Rows in generation order.
    pub records: Vec<RawRecord>,
}

impl RawDataset {
    /// Create an empty dataset for `domain`.
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            records: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&RawValue> {
        let idx = field_index(self.domain.schema(), column)?;
        self.records.get(row).and_then(|record| record.values.get(idx))
    }

    /// Iterate one column top to bottom.
    pub fn column<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a RawValue> + 'a {
        let idx = field_index(self.domain.schema(), column);
        self.records
            .iter()
            .filter_map(move |record| idx.and_then(|idx| record.values.get(idx)))
    }

    /// Order-sensitive content hash, used to compare generator runs.
    pub fn fingerprint(&self) -> u64 {
        stable_hash_with(|hasher| {
            self.domain.hash(hasher);
            self.records.hash(hasher);
        })
    }
}

/// A cleaned cell with its canonical type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CleanValue {
    /// Missing value.
    Null,
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Free text, including unparsable sentinels.
    Text(String),
    /// Parsed observation time.
    Timestamp(NaiveDateTime),
}

impl CleanValue {
    /// True for a missing cell.
    pub fn is_null(&self) -> bool {
        matches!(self, CleanValue::Null)
    }

    /// Numeric value, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CleanValue::Float(value) => Some(*value),
            CleanValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Integer value, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CleanValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Text value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CleanValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Timestamp value, if any.
    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        match self {
            CleanValue::Timestamp(value) => Some(value),
            _ => None,
        }
    }

    /// Lower back to a raw cell, rendering timestamps as text.
    pub fn to_raw(&self) -> RawValue {
        match self {
            CleanValue::Null => RawValue::Null,
            CleanValue::Int(value) => RawValue::Int(*value),
            CleanValue::Float(value) => RawValue::Float(*value),
            CleanValue::Text(value) => RawValue::Text(value.clone()),
            CleanValue::Timestamp(value) => RawValue::Text(format_timestamp(value, RENDER_FORMAT)),
        }
    }
}

impl PartialEq for CleanValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CleanValue::Null, CleanValue::Null) => true,
            (CleanValue::Int(a), CleanValue::Int(b)) => a == b,
            (CleanValue::Float(a), CleanValue::Float(b)) => float_key(*a) == float_key(*b),
            (CleanValue::Text(a), CleanValue::Text(b)) => a == b,
            (CleanValue::Timestamp(a), CleanValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CleanValue {}

impl Hash for CleanValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CleanValue::Null => {}
            CleanValue::Int(value) => value.hash(state),
            CleanValue::Float(value) => float_key(*value).hash(state),
            CleanValue::Text(value) => value.hash(state),
            CleanValue::Timestamp(value) => value.hash(state),
        }
    }
}

/// One cleaned row, in the same column order as the domain's raw schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleanRecord {
    /// Cells in column order.
    pub values: Vec<CleanValue>,
}

/// Cleaner output (Silver tier) for one domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanDataset {
    /// Domain whose schema the rows follow.
    pub domain: Domain,
    /// Rows.
    pub records: Vec<CleanRecord>,
}

impl CleanDataset {
    /// Create an empty dataset for `domain`.
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            records: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&CleanValue> {
        let idx = field_index(self.domain.schema(), column)?;
        self.records.get(row).and_then(|record| record.values.get(idx))
    }

    /// Iterate one column top to bottom.
    pub fn column<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a CleanValue> + 'a {
        let idx = field_index(self.domain.schema(), column);
        self.records
            .iter()
            .filter_map(move |record| idx.and_then(|idx| record.values.get(idx)))
    }

    /// Re-express as a raw dataset so it can be fed back through the cleaner.
    pub fn to_raw(&self) -> RawDataset {
        RawDataset {
            domain: self.domain,
            records: self
                .records
                .iter()
                .map(|record| RawRecord {
                    values: record.values.iter().map(CleanValue::to_raw).collect(),
                })
                .collect(),
        }
    }
}

/// Merge Engine output (Gold tier): fixed columns, one row per joined pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedDataset {
    /// Output columns, in order.
    pub columns: Vec<ColumnSpec>,
    /// Rows.
    pub records: Vec<CleanRecord>,
}

impl MergedDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names, in output order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&CleanValue> {
        let idx = self.columns.iter().position(|spec| spec.name == column)?;
        self.records.get(row).and_then(|record| record.values.get(idx))
    }
}
