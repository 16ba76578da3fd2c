use std::io;

use thiserror::Error;

use crate::types::{ColumnName, ObjectName};

/// Error type for artifact IO, codec, and configuration failures.
///
/// Messy field values are never errors; they are repaired or dropped by the
/// cleaner. Only structural problems surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem failure in the lake.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Raw CSV encode or decode failure.
    #[error("csv codec failure: {0}")]
    Csv(#[from] csv::Error),
    /// Parquet encode or decode failure.
    #[error("parquet codec failure: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    /// Run summary serialization failure.
    #[error("summary serialization failure: {0}")]
    Json(#[from] serde_json::Error),
    /// Rejected configuration, schema, or anomaly table.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A shared merge column with no resolution rule under the strict policy.
    #[error("column '{column}' is present in both merge inputs and has no resolution rule")]
    SchemaCollision {
        /// Column present on both sides.
        column: ColumnName,
    },
    /// An artifact exists but does not decode, or is missing.
    #[error("artifact '{artifact}' is unreadable: {reason}")]
    ArtifactUnreadable {
        /// Object name inside its tier.
        artifact: ObjectName,
        /// What went wrong.
        reason: String,
    },
}
