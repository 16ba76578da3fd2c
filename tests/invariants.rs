use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use wxtraffic::constants::{bounds, columns, labels};
use wxtraffic::{
    CleanDataset, CleanValue, CollisionPolicy, Domain, FieldKind, GeneratorConfig, MergePlan,
    clean_dataset, generate_dataset, merge,
};

fn config(records: usize) -> GeneratorConfig {
    GeneratorConfig {
        records,
        ..GeneratorConfig::default()
    }
}

fn cleaned(domain: Domain, records: usize, seed: u64) -> CleanDataset {
    let raw = generate_dataset(domain, &config(records), &mut StdRng::seed_from_u64(seed)).unwrap();
    clean_dataset(&raw, &mut StdRng::seed_from_u64(seed + 1)).dataset
}

#[test]
fn generator_is_reproducible_for_every_seed_and_size() {
    for (records, seed) in [(1, 0), (37, 1), (500, 2), (2000, 3)] {
        for domain in Domain::ALL {
            let a = generate_dataset(domain, &config(records), &mut StdRng::seed_from_u64(seed))
                .unwrap();
            let b = generate_dataset(domain, &config(records), &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(a, b);
            assert_eq!(a.len(), records + (records * 5).div_ceil(100));
        }
    }
}

#[test]
fn one_stream_for_both_domains_is_order_dependent_but_reproducible() {
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let weather = generate_dataset(Domain::Weather, &config(100), &mut rng).unwrap();
        let traffic = generate_dataset(Domain::Traffic, &config(100), &mut rng).unwrap();
        (weather.fingerprint(), traffic.fingerprint())
    };
    assert_eq!(run(7), run(7));

    let solo = generate_dataset(Domain::Traffic, &config(100), &mut StdRng::seed_from_u64(7))
        .unwrap()
        .fingerprint();
    assert_ne!(run(7).1, solo);
}

#[test]
fn measured_anomaly_rates_are_in_expected_range() {
    let raw = generate_dataset(Domain::Weather, &config(5000), &mut StdRng::seed_from_u64(42))
        .unwrap();
    let outliers = raw
        .column(columns::TEMPERATURE_C)
        .filter(|value| match value {
            wxtraffic::RawValue::Int(v) => *v == -30 || *v == 60 || *v == 100,
            _ => false,
        })
        .count();
    let rate = outliers as f64 / raw.len() as f64;
    // 0.30 * 0.05 = 0.015
    assert!((0.008..0.025).contains(&rate), "temperature outlier rate {rate}");
}

#[test]
fn cleaned_values_respect_bounds_labels_and_critical_fields() {
    for domain in Domain::ALL {
        let dataset = cleaned(domain, 3000, 11);
        assert!(!dataset.is_empty());
        let unique: HashSet<_> = dataset.records.iter().collect();
        assert_eq!(unique.len(), dataset.len(), "{domain} has duplicate rows");

        for (idx, field) in domain.schema().iter().enumerate() {
            for record in &dataset.records {
                let value = &record.values[idx];
                if field.critical {
                    assert!(!value.is_null(), "{domain}.{} is null", field.name);
                }
                if let FieldKind::Measurement(bounds) = field.kind {
                    if let Some(number) = value.as_f64() {
                        assert!(number >= bounds.min && number <= bounds.max);
                    }
                }
                if let FieldKind::Category(valid) = field.kind {
                    assert!(value.as_str().is_some_and(|label| valid.contains(&label)));
                }
            }
        }
    }
}

#[test]
fn clip_bounds_match_documented_intervals() {
    assert_eq!((bounds::TEMPERATURE_C.min, bounds::TEMPERATURE_C.max), (-10.0, 40.0));
    assert_eq!((bounds::WEATHER_VISIBILITY_M.min, bounds::WEATHER_VISIBILITY_M.max), (50.0, 20000.0));
    assert_eq!((bounds::TRAFFIC_VISIBILITY_M.min, bounds::TRAFFIC_VISIBILITY_M.max), (50.0, 10000.0));
    assert_eq!((bounds::ACCIDENT_COUNT.min, bounds::ACCIDENT_COUNT.max), (0.0, 20.0));
}

#[test]
fn cleaned_areas_never_include_generator_only_districts() {
    let dataset = cleaned(Domain::Traffic, 2000, 5);
    let areas: HashSet<&str> = dataset
        .column(columns::AREA)
        .filter_map(CleanValue::as_str)
        .collect();
    assert!(areas.iter().all(|area| labels::AREAS.contains(area)));
    assert!(!areas.contains("Hounslow"));
}

#[test]
fn recleaning_is_a_no_op() {
    for domain in Domain::ALL {
        let once = cleaned(domain, 1200, 31);
        let twice = clean_dataset(&once.to_raw(), &mut StdRng::seed_from_u64(1_000));
        assert_eq!(twice.dataset, once);
        assert_eq!(twice.report.rows_in, twice.report.rows_out);
    }
}

#[test]
fn merged_rows_share_hour_and_city() {
    let weather = cleaned(Domain::Weather, 600, 3);
    let traffic = cleaned(Domain::Traffic, 600, 4);
    let plan = MergePlan::standard(CollisionPolicy::PreferWeather).unwrap();
    let outcome = merge(&weather, &traffic, &plan).unwrap();
    assert_eq!(outcome.dataset.column_names(), columns::MERGED.to_vec());
    assert!(!outcome.dataset.is_empty());
    for row in 0..outcome.dataset.len() {
        assert_eq!(
            outcome.dataset.value(row, columns::CITY).and_then(CleanValue::as_str),
            Some("London")
        );
        assert!(
            outcome
                .dataset
                .value(row, columns::DATE_TIME)
                .and_then(CleanValue::as_timestamp)
                .is_some()
        );
    }
    assert!(outcome.report.matched_keys <= weather.len().min(traffic.len()));
}
