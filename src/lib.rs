#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Declarative corruption rules used by the generator.
pub mod anomaly;
/// Command-line runner shared by the binary.
pub mod apps;
/// Raw CSV and parquet table codecs.
pub mod artifacts;
/// Per-field coercion, repair, and filtering of raw datasets.
pub mod cleaner;
/// Generator and pipeline configuration types.
pub mod config;
/// Centralized constants: generator rates, label sets, bounds, formats, lake names.
pub mod constants;
/// Raw, clean, and merged dataset types.
pub mod data;
/// Seeded synthetic record generation.
pub mod generator;
mod hash;
/// Hour-bucket hash join of cleaned datasets.
pub mod merge;
/// Data-quality profiles of raw datasets.
pub mod metrics;
/// Stage orchestration over the local lake.
pub mod pipeline;
/// Per-domain field rule tables.
pub mod schema;
/// Timestamp parsing, rendering, and calendar helpers.
pub mod timestamps;
/// Storage transports (local filesystem lake).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use anomaly::{AnomalyModel, Corruption};
pub use cleaner::{CleanOutcome, CleaningReport, clean_dataset};
pub use config::{CollisionPolicy, GeneratorConfig, PipelineConfig};
pub use data::{
    CleanDataset, CleanRecord, CleanValue, Domain, MergedDataset, RawDataset, RawRecord, RawValue,
    Season,
};
pub use errors::PipelineError;
pub use generator::generate_dataset;
pub use merge::{MergeOutcome, MergePlan, MergeReport, Side, merge};
pub use metrics::{DatasetProfile, profile_dataset};
pub use pipeline::{Pipeline, RunSummary};
pub use schema::{Bounds, ColumnSpec, ColumnType, FieldKind, FieldSpec};
pub use transport::{LakeStore, Tier};
pub use types::{ColumnName, ObjectName, PathString};
