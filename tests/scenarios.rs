use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;

use wxtraffic::{
    CleanDataset, CleanRecord, CleanValue, CollisionPolicy, Domain, MergePlan, RawDataset,
    RawRecord, RawValue, clean_dataset, merge,
};

fn text(value: &str) -> RawValue {
    RawValue::Text(value.to_string())
}

fn weather(id: RawValue, date_time: RawValue, temperature: RawValue) -> RawRecord {
    RawRecord {
        values: vec![
            id,
            date_time,
            text("London"),
            RawValue::Null,
            temperature,
            RawValue::Int(70),
            RawValue::Float(0.4),
            RawValue::Float(18.0),
            RawValue::Int(9000),
            text("Rain"),
            RawValue::Float(1012.0),
        ],
    }
}

fn clean_one(record: RawRecord, domain: Domain) -> CleanDataset {
    let raw = RawDataset {
        domain,
        records: vec![record],
    };
    clean_dataset(&raw, &mut StdRng::seed_from_u64(0)).dataset
}

#[test]
fn unknown_timestamp_row_is_removed() {
    let cleaned = clean_one(
        weather(RawValue::Null, text("Unknown"), RawValue::Int(100)),
        Domain::Weather,
    );
    assert!(cleaned.is_empty());
}

#[test]
fn hot_reading_clips_to_forty() {
    let cleaned = clean_one(
        weather(RawValue::Int(5001), text("2024-01-01 00:00"), RawValue::Int(100)),
        Domain::Weather,
    );
    assert_eq!(cleaned.value(0, "temperature_c"), Some(&CleanValue::Float(40.0)));
    assert_eq!(
        cleaned.value(0, "season").and_then(CleanValue::as_str),
        Some("Winter")
    );
}

#[test]
fn negative_speed_clips_to_zero() {
    let cleaned = clean_one(
        RawRecord {
            values: vec![
                RawValue::Int(9001),
                text("2024-01-01 08:20"),
                text("London"),
                text("Westminster"),
                RawValue::Int(3500),
                RawValue::Int(-30),
                RawValue::Int(1),
                text("Medium"),
                text("Wet"),
                RawValue::Int(800),
            ],
        },
        Domain::Traffic,
    );
    assert_eq!(cleaned.value(0, "avg_speed_kmh"), Some(&CleanValue::Float(0.0)));
}

#[test]
fn same_hour_weather_and_traffic_merge_into_one_row() {
    let eight = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let weather = CleanDataset {
        domain: Domain::Weather,
        records: vec![CleanRecord {
            values: vec![
                CleanValue::Int(5009),
                CleanValue::Timestamp(eight),
                CleanValue::Text("London".to_string()),
                CleanValue::Text("Winter".to_string()),
                CleanValue::Float(4.2),
                CleanValue::Float(90.0),
                CleanValue::Float(3.0),
                CleanValue::Float(22.0),
                CleanValue::Float(1500.0),
                CleanValue::Text("Fog".to_string()),
                CleanValue::Float(998.0),
            ],
        }],
    };
    let traffic = CleanDataset {
        domain: Domain::Traffic,
        records: vec![CleanRecord {
            values: vec![
                CleanValue::Int(9009),
                CleanValue::Timestamp(eight),
                CleanValue::Text("London".to_string()),
                CleanValue::Text("Lambeth".to_string()),
                CleanValue::Float(4200.0),
                CleanValue::Float(25.0),
                CleanValue::Float(0.0),
                CleanValue::Text("High".to_string()),
                CleanValue::Text("Dry".to_string()),
                CleanValue::Float(9000.0),
            ],
        }],
    };
    let plan = MergePlan::standard(CollisionPolicy::PreferWeather).unwrap();
    let merged = merge(&weather, &traffic, &plan).unwrap().dataset;
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.value(0, "temperature_c"), Some(&CleanValue::Float(4.2)));
    assert_eq!(merged.value(0, "visibility_m"), Some(&CleanValue::Float(1500.0)));
    assert_eq!(merged.value(0, "vehicle_count"), Some(&CleanValue::Float(4200.0)));
}
