/// Constants used by the synthetic record generator.
pub mod generator {
    /// Probability that a generated record is flagged as messy.
    pub const ISSUE_PROBABILITY: f64 = 0.30;
    /// Percentage of `N` appended as duplicate rows (rounded up).
    pub const DUPLICATE_PERCENT: usize = 5;
    /// Chance that an injected duplicate gets a colliding identifier.
    pub const DUPLICATE_ID_COLLISION_PROBABILITY: f64 = 0.5;
    /// Number of leading records whose identifiers feed collision draws.
    pub const ID_COLLISION_POOL: usize = 100;
    /// Seed of the final full-dataset shuffle.
    pub const SHUFFLE_SEED: u64 = 42;
    /// Default number of base records per domain.
    pub const DEFAULT_RECORDS: usize = 5000;
    /// Default seed for the run-scoped random stream.
    pub const DEFAULT_SEED: u64 = 7;
    /// Identifier offset for weather records (first id is offset + 1).
    pub const WEATHER_ID_OFFSET: i64 = 5000;
    /// Identifier offset for traffic records (first id is offset + 1).
    pub const TRAFFIC_ID_OFFSET: i64 = 9000;
    /// Start of the generated time axis, `YYYY-MM-DD HH:MM`.
    pub const START_TIME: &str = "2024-01-01 00:00";
    /// Upper bound (inclusive) of the per-record traffic minute jitter.
    pub const TRAFFIC_MINUTE_JITTER: u32 = 59;
    /// Rush-hour windows as inclusive hour ranges.
    pub const RUSH_HOURS: [(u32, u32); 2] = [(7, 9), (17, 19)];

    /// Districts the traffic generator draws from.
    ///
    /// Six of these are missing from the cleaner's valid set and get
    /// resampled during cleaning.
    pub const GENERATOR_AREAS: [&str; 15] = [
        "Camden",
        "Chelsea",
        "Islington",
        "Southwark",
        "Kensington",
        "Westminster",
        "Greenwich",
        "Hackney",
        "Lambeth",
        "Tower Hamlets",
        "Wandsworth",
        "Hammersmith",
        "Brent",
        "Ealing",
        "Hounslow",
    ];

    /// Alternate (still parseable) timestamp encodings for weather rows.
    pub const WEATHER_ALT_TIMESTAMP_FORMATS: [&str; 3] =
        ["%d/%m/%Y %I:%M%p", "%Y-%m-%dT%H:%MZ", "%Y/%m/%d %H:%M:%S"];
    /// Alternate (still parseable) timestamp encodings for traffic rows.
    pub const TRAFFIC_ALT_TIMESTAMP_FORMATS: [&str; 3] =
        ["%d/%m/%Y %I:%M%p", "%Y-%m-%dT%H:%MZ", "%d-%b-%Y %H:%M"];
    /// Sentinel strings injected as invalid weather timestamps.
    pub const WEATHER_INVALID_TIMESTAMPS: [&str; 3] = ["2099-13-40 25:61", "Unknown", "Invalid Date"];
    /// Sentinel strings injected as invalid traffic timestamps.
    pub const TRAFFIC_INVALID_TIMESTAMPS: [&str; 4] = ["TBD", "2099-00-00 99:99", "Unknown", "N/A"];
    /// Labels injected into the season column that are not seasons.
    pub const INVALID_SEASONS: [&str; 4] = ["Monsoon", "Fall", "Rainy", "Dry"];
    /// Labels injected into the congestion column that are not levels.
    pub const INVALID_CONGESTION: [&str; 5] = ["Very High", "Low-Medium", "Heavy", "Light", "Severe"];
    /// Strings injected into the weather visibility column.
    pub const NON_NUMERIC_VISIBILITY: [&str; 4] = ["Low", "Very Low", "High", "Unknown"];
}

/// Constants used by the field cleaner.
pub mod cleaner {
    /// Default seed for category resampling draws.
    pub const DEFAULT_SEED: u64 = 11;
}

/// Valid categorical label sets enforced by the cleaner.
pub mod labels {
    /// The single city both datasets describe.
    pub const CITY: &str = "London";
    /// Canonical seasons.
    pub const SEASONS: [&str; 4] = ["Winter", "Spring", "Summer", "Autumn"];
    /// Valid `weather_condition` labels.
    pub const WEATHER_CONDITIONS: [&str; 5] = ["Clear", "Rain", "Fog", "Storm", "Snow"];
    /// Valid `congestion_level` labels.
    pub const CONGESTION_LEVELS: [&str; 3] = ["Low", "Medium", "High"];
    /// Valid `road_condition` labels.
    pub const ROAD_CONDITIONS: [&str; 4] = ["Dry", "Wet", "Snowy", "Damaged"];
    /// Districts the cleaner accepts as `area`.
    pub const AREAS: [&str; 9] = [
        "Camden",
        "Chelsea",
        "Islington",
        "Southwark",
        "Kensington",
        "Westminster",
        "Greenwich",
        "Hackney",
        "Lambeth",
    ];
}

/// Physical-domain clip intervals applied by the cleaner.
pub mod bounds {
    use crate::schema::Bounds;

    /// Air temperature, degrees Celsius.
    pub const TEMPERATURE_C: Bounds = Bounds::new(-10.0, 40.0);
    /// Relative humidity, percent.
    pub const HUMIDITY: Bounds = Bounds::new(0.0, 100.0);
    /// Hourly rainfall, millimetres.
    pub const RAIN_MM: Bounds = Bounds::new(0.0, 100.0);
    /// Wind speed, km/h.
    pub const WIND_SPEED_KMH: Bounds = Bounds::new(0.0, 150.0);
    /// Weather-station visibility, metres.
    pub const WEATHER_VISIBILITY_M: Bounds = Bounds::new(50.0, 20000.0);
    /// Air pressure, hectopascals.
    pub const AIR_PRESSURE_HPA: Bounds = Bounds::new(950.0, 1050.0);
    /// Vehicles counted per hour.
    pub const VEHICLE_COUNT: Bounds = Bounds::new(0.0, 10000.0);
    /// Average traffic speed, km/h.
    pub const AVG_SPEED_KMH: Bounds = Bounds::new(0.0, 120.0);
    /// Accidents per hour.
    pub const ACCIDENT_COUNT: Bounds = Bounds::new(0.0, 20.0);
    /// Roadside visibility, metres.
    pub const TRAFFIC_VISIBILITY_M: Bounds = Bounds::new(50.0, 10000.0);
}

/// Constants used by timestamp parsing and rendering.
pub mod timestamps {
    /// Format the generator writes for well-formed timestamps.
    pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M";
    /// Format used when a cleaned timestamp is rendered back to text.
    pub const RENDER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    /// Every format the cleaner accepts, tried in order.
    pub const ACCEPTED_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %I:%M%p",
        "%Y-%m-%dT%H:%MZ",
        "%Y/%m/%d %H:%M:%S",
        "%d-%b-%Y %H:%M",
    ];
}

/// Column names shared by schemas and the merge plan.
pub mod columns {
    /// Weather identifier column.
    pub const WEATHER_ID: &str = "weather_id";
    /// Traffic identifier column.
    pub const TRAFFIC_ID: &str = "traffic_id";
    /// Observation time; the merge key together with `city`.
    pub const DATE_TIME: &str = "date_time";
    /// `city` column.
    pub const CITY: &str = "city";
    /// `season` column.
    pub const SEASON: &str = "season";
    /// `temperature_c` column.
    pub const TEMPERATURE_C: &str = "temperature_c";
    /// `humidity` column.
    pub const HUMIDITY: &str = "humidity";
    /// `rain_mm` column.
    pub const RAIN_MM: &str = "rain_mm";
    /// `wind_speed_kmh` column.
    pub const WIND_SPEED_KMH: &str = "wind_speed_kmh";
    /// Visibility; present in both domains.
    pub const VISIBILITY_M: &str = "visibility_m";
    /// `weather_condition` column.
    pub const WEATHER_CONDITION: &str = "weather_condition";
    /// `air_pressure_hpa` column.
    pub const AIR_PRESSURE_HPA: &str = "air_pressure_hpa";
    /// London district of a traffic observation.
    pub const AREA: &str = "area";
    /// `vehicle_count` column.
    pub const VEHICLE_COUNT: &str = "vehicle_count";
    /// `avg_speed_kmh` column.
    pub const AVG_SPEED_KMH: &str = "avg_speed_kmh";
    /// `accident_count` column.
    pub const ACCIDENT_COUNT: &str = "accident_count";
    /// `congestion_level` column.
    pub const CONGESTION_LEVEL: &str = "congestion_level";
    /// `road_condition` column.
    pub const ROAD_CONDITION: &str = "road_condition";

    /// Final merged schema, in order.
    pub const MERGED: [&str; 16] = [
        DATE_TIME,
        CITY,
        SEASON,
        TEMPERATURE_C,
        HUMIDITY,
        RAIN_MM,
        WIND_SPEED_KMH,
        WEATHER_CONDITION,
        AIR_PRESSURE_HPA,
        AREA,
        VEHICLE_COUNT,
        AVG_SPEED_KMH,
        ACCIDENT_COUNT,
        CONGESTION_LEVEL,
        ROAD_CONDITION,
        VISIBILITY_M,
    ];
}

/// Constants used by the local lake layout.
pub mod lake {
    /// Default lake root directory.
    pub const DEFAULT_ROOT: &str = ".wxtraffic_lake";
    /// Tier holding raw CSV artifacts.
    pub const BRONZE_DIR: &str = "bronze";
    /// Tier holding cleaned parquet artifacts.
    pub const SILVER_DIR: &str = "silver";
    /// Tier holding the merged parquet artifact.
    pub const GOLD_DIR: &str = "gold";
    /// Raw weather object in bronze.
    pub const WEATHER_RAW: &str = "weather_data_raw.csv";
    /// Raw traffic object in bronze.
    pub const TRAFFIC_RAW: &str = "traffic_data_raw.csv";
    /// Cleaned weather object in silver.
    pub const WEATHER_CLEAN: &str = "weather_cleaned.parquet";
    /// Cleaned traffic object in silver.
    pub const TRAFFIC_CLEAN: &str = "traffic_cleaned.parquet";
    /// Merged object in gold.
    pub const MERGED: &str = "merged_dataset.parquet";
    /// Run summary written next to the tiers.
    pub const RUN_SUMMARY: &str = "dataset_summary.json";
}
