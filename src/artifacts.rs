//! Artifact codecs: raw CSV for bronze, optional-column parquet for silver and gold.
//!
//! Codecs work on in-memory buffers; `LakeStore` owns where the bytes live.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::parser::parse_message_type;

use crate::data::{CleanDataset, CleanRecord, CleanValue, Domain, MergedDataset, RawDataset, RawRecord, RawValue};
use crate::errors::PipelineError;
use crate::schema::{ColumnSpec, ColumnType, column_specs};

static NULL_CELL: CleanValue = CleanValue::Null;

fn unreadable(artifact: &str, reason: impl Into<String>) -> PipelineError {
    PipelineError::ArtifactUnreadable {
        artifact: artifact.to_string(),
        reason: reason.into(),
    }
}

/// Encode a raw dataset as CSV with a header in raw-schema order.
pub fn encode_raw_csv(dataset: &RawDataset) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.domain.schema().iter().map(|field| field.name))?;
    for record in &dataset.records {
        writer.write_record(record.values.iter().map(RawValue::to_cell))?;
    }
    writer
        .into_inner()
        .map_err(|err| PipelineError::Io(io::Error::new(err.error().kind(), err.error().to_string())))
}

/// Decode a raw CSV artifact; the header must match the domain schema exactly.
pub fn decode_raw_csv(
    artifact: &str,
    bytes: &[u8],
    domain: Domain,
) -> Result<RawDataset, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let expected: Vec<&str> = domain.schema().iter().map(|field| field.name).collect();
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if header != expected {
        return Err(unreadable(
            artifact,
            format!("header {header:?} does not match {domain} schema {expected:?}"),
        ));
    }
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(RawRecord {
            values: row.iter().map(RawValue::from_cell).collect(),
        });
    }
    Ok(RawDataset { domain, records })
}

fn message_type(name: &str, columns: &[ColumnSpec]) -> String {
    let fields: Vec<String> = columns
        .iter()
        .map(|column| match column.column_type {
            ColumnType::Int64 => format!("OPTIONAL INT64 {};", column.name),
            ColumnType::TimestampMillis => {
                format!("OPTIONAL INT64 {} (TIMESTAMP_MILLIS);", column.name)
            }
            ColumnType::Double => format!("OPTIONAL DOUBLE {};", column.name),
            ColumnType::Utf8 => format!("OPTIONAL BINARY {} (UTF8);", column.name),
        })
        .collect();
    format!("message {name} {{ {} }}", fields.join(" "))
}

fn split_levels<T>(cells: impl Iterator<Item = Option<T>>) -> (Vec<T>, Vec<i16>) {
    let mut values = Vec::new();
    let mut levels = Vec::new();
    for cell in cells {
        match cell {
            Some(value) => {
                values.push(value);
                levels.push(1);
            }
            None => levels.push(0),
        }
    }
    (values, levels)
}

fn write_table(
    name: &str,
    columns: &[ColumnSpec],
    records: &[CleanRecord],
) -> Result<Vec<u8>, PipelineError> {
    let schema = Arc::new(parse_message_type(&message_type(name, columns))?);
    let props = Arc::new(WriterProperties::builder().build());
    let mut buffer = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buffer, schema, props)?;

    if !records.is_empty() {
        let mut row_group = writer.next_row_group()?;
        for (idx, spec) in columns.iter().enumerate() {
            let Some(mut column) = row_group.next_column()? else {
                return Err(ParquetError::General(format!(
                    "column writer for '{}' missing",
                    spec.name
                ))
                .into());
            };
            let cells = records
                .iter()
                .map(|record| record.values.get(idx).unwrap_or(&NULL_CELL));
            match column.untyped() {
                ColumnWriter::Int64ColumnWriter(writer) => {
                    let (values, levels) = split_levels(cells.map(|cell| match spec.column_type {
                        ColumnType::TimestampMillis => cell
                            .as_timestamp()
                            .map(|ts| ts.and_utc().timestamp_millis()),
                        _ => cell.as_int(),
                    }));
                    writer.write_batch(&values, Some(levels.as_slice()), None)?;
                }
                ColumnWriter::DoubleColumnWriter(writer) => {
                    let (values, levels) = split_levels(cells.map(CleanValue::as_f64));
                    writer.write_batch(&values, Some(levels.as_slice()), None)?;
                }
                ColumnWriter::ByteArrayColumnWriter(writer) => {
                    let (values, levels) =
                        split_levels(cells.map(|cell| cell.as_str().map(ByteArray::from)));
                    writer.write_batch(&values, Some(levels.as_slice()), None)?;
                }
                _ => {
                    return Err(ParquetError::General(format!(
                        "unsupported physical type for '{}'",
                        spec.name
                    ))
                    .into());
                }
            }
            column.close()?;
        }
        row_group.close()?;
    }
    writer.close()?;
    Ok(buffer)
}

fn timestamp_from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|ts| ts.naive_utc())
}

fn decode_field(artifact: &str, field: &Field, spec: &ColumnSpec) -> Result<CleanValue, PipelineError> {
    let value = match (field, spec.column_type) {
        (Field::Null, _) => Some(CleanValue::Null),
        (Field::Long(value), ColumnType::Int64) => Some(CleanValue::Int(*value)),
        (Field::TimestampMillis(value) | Field::Long(value), ColumnType::TimestampMillis) => {
            timestamp_from_millis(*value).map(CleanValue::Timestamp)
        }
        (Field::Double(value), ColumnType::Double) => Some(CleanValue::Float(*value)),
        (Field::Str(value), ColumnType::Utf8) => Some(CleanValue::Text(value.clone())),
        _ => None,
    };
    value.ok_or_else(|| {
        unreadable(
            artifact,
            format!("column '{}' holds unexpected value {field:?}", spec.name),
        )
    })
}

fn read_table(
    artifact: &str,
    bytes: Vec<u8>,
    columns: &[ColumnSpec],
) -> Result<Vec<CleanRecord>, PipelineError> {
    let reader = SerializedFileReader::new(Bytes::from(bytes))?;
    let found: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let expected: Vec<&str> = columns.iter().map(|column| column.name).collect();
    if found != expected {
        return Err(unreadable(
            artifact,
            format!("columns {found:?} do not match expected {expected:?}"),
        ));
    }

    let mut records = Vec::new();
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let values = row
            .get_column_iter()
            .zip(columns)
            .map(|((_, field), spec)| decode_field(artifact, field, spec))
            .collect::<Result<Vec<_>, _>>()?;
        records.push(CleanRecord { values });
    }
    Ok(records)
}

/// Encode a cleaned domain table.
pub fn encode_clean_parquet(dataset: &CleanDataset) -> Result<Vec<u8>, PipelineError> {
    let columns = column_specs(dataset.domain.schema());
    let name = format!("{}_cleaned", dataset.domain);
    write_table(&name, &columns, &dataset.records)
}

/// Decode a cleaned domain table, checking its columns against the domain schema.
pub fn decode_clean_parquet(
    artifact: &str,
    bytes: Vec<u8>,
    domain: Domain,
) -> Result<CleanDataset, PipelineError> {
    let columns = column_specs(domain.schema());
    Ok(CleanDataset {
        domain,
        records: read_table(artifact, bytes, &columns)?,
    })
}

/// Encode the merged table.
pub fn encode_merged_parquet(dataset: &MergedDataset) -> Result<Vec<u8>, PipelineError> {
    write_table("merged_dataset", &dataset.columns, &dataset.records)
}

/// Decode the merged table; `columns` is the expected output schema.
pub fn decode_merged_parquet(
    artifact: &str,
    bytes: Vec<u8>,
    columns: &[ColumnSpec],
) -> Result<MergedDataset, PipelineError> {
    Ok(MergedDataset {
        columns: columns.to_vec(),
        records: read_table(artifact, bytes, columns)?,
    })
}
