/// Column name as it appears in raw, clean, and merged schemas.
/// Examples: `temperature_c`, `date_time`, `visibility_m`
pub type ColumnName = String;
/// Name of a stored artifact inside a lake tier.
/// Examples: `weather_data_raw.csv`, `merged_dataset.parquet`
pub type ObjectName = String;
/// Lake-relative file path strings reported by tier listings.
/// Example: `bronze/weather_data_raw.csv`
pub type PathString = String;
