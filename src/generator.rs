//! Synthetic weather and traffic record generation.
//!
//! Every random draw comes from the caller's RNG handle, consumed in a fixed
//! sequential order: per record the issue flag, then context, then baseline
//! values, then per-field corruption. Duplicate injection follows, then a
//! separately seeded shuffle.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom, index};
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::anomaly::AnomalyModel;
use crate::config::GeneratorConfig;
use crate::constants::generator::{
    DUPLICATE_ID_COLLISION_PROBABILITY, GENERATOR_AREAS, TRAFFIC_MINUTE_JITTER,
};
use crate::constants::labels::{CITY, ROAD_CONDITIONS, WEATHER_CONDITIONS};
use crate::data::{Domain, RawDataset, RawRecord, RawValue, Season};
use crate::errors::PipelineError;
use crate::schema::field_index;
use crate::timestamps::{CANONICAL_FORMAT, format_timestamp, is_rush_hour, season_of};

/// Per-record generation context derived before any value is sampled.
#[derive(Clone, Copy, Debug)]
pub struct RecordContext {
    /// Sequential index within the base records.
    pub index: usize,
    /// Uncorrupted observation time.
    pub timestamp: NaiveDateTime,
    /// Season of `timestamp`.
    pub season: Season,
    /// Whether `timestamp` falls in a rush hour.
    pub rush_hour: bool,
}

/// Generate `config.records` base records plus duplicates, shuffled.
pub fn generate_dataset<R: Rng + ?Sized>(
    domain: Domain,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<RawDataset, PipelineError> {
    config.validate()?;
    let schema = domain.schema();
    let model = AnomalyModel::for_domain(domain).with_issue_probability(config.issue_probability);
    model.validate(schema)?;

    let mut records = Vec::with_capacity(config.records + config.duplicate_count());
    let mut corrupted_records = 0usize;
    for index in 0..config.records {
        let has_issues = model.draw_has_issues(rng);
        let ctx = record_context(domain, config.start, index, rng);
        let mut values = match domain {
            Domain::Weather => weather_baseline(&ctx, domain.id_offset(), rng),
            Domain::Traffic => traffic_baseline(&ctx, domain.id_offset(), rng),
        };
        if has_issues {
            corrupted_records += 1;
            for (field, value) in schema.iter().zip(values.iter_mut()) {
                if let Some(corruption) = model.select(field.name, rng) {
                    *value = corruption.apply(&ctx.timestamp, rng);
                }
            }
        }
        records.push(RawRecord { values });
    }

    let duplicates = inject_duplicates(domain, &mut records, config, rng);

    let mut shuffler = StdRng::seed_from_u64(config.shuffle_seed);
    records.shuffle(&mut shuffler);

    info!(
        "[wxtraffic:generate] {}: {} base records ({} flagged messy) + {} duplicates",
        domain, config.records, corrupted_records, duplicates
    );
    Ok(RawDataset { domain, records })
}

/// Time axis and derived context for the record at `index`.
pub fn record_context<R: Rng + ?Sized>(
    domain: Domain,
    start: NaiveDateTime,
    index: usize,
    rng: &mut R,
) -> RecordContext {
    let hours = start + Duration::hours(index as i64);
    let timestamp = match domain {
        Domain::Weather => hours,
        Domain::Traffic => {
            hours + Duration::minutes(i64::from(rng.random_range(0..=TRAFFIC_MINUTE_JITTER)))
        }
    };
    RecordContext {
        index,
        timestamp,
        season: season_of(&timestamp),
        rush_hour: is_rush_hour(&timestamp),
    }
}

/// Canonical weather row in schema order, conditioned on season.
pub fn weather_baseline<R: Rng + ?Sized>(
    ctx: &RecordContext,
    id_offset: i64,
    rng: &mut R,
) -> Vec<RawValue> {
    let (temp_low, temp_high) = match ctx.season {
        Season::Winter => (-5.0, 15.0),
        Season::Summer => (10.0, 35.0),
        Season::Spring => (5.0, 25.0),
        Season::Autumn => (5.0, 20.0),
    };
    let wet_season = matches!(ctx.season, Season::Winter | Season::Autumn);
    let humidity = if wet_season {
        rng.random_range(60..=100)
    } else {
        rng.random_range(20..=80)
    };
    let rain_high = if wet_season { 30.0 } else { 10.0 };
    let condition_weights: [f64; 5] = match ctx.season {
        Season::Winter => [0.4, 0.2, 0.1, 0.1, 0.2],
        Season::Summer => [0.7, 0.1, 0.05, 0.1, 0.05],
        Season::Spring | Season::Autumn => [0.5, 0.25, 0.1, 0.1, 0.05],
    };

    vec![
        RawValue::Int(id_offset + ctx.index as i64 + 1),
        RawValue::Text(format_timestamp(&ctx.timestamp, CANONICAL_FORMAT)),
        RawValue::Text(CITY.to_string()),
        RawValue::Text(ctx.season.as_str().to_string()),
        RawValue::Float(round1(rng.random_range(temp_low..temp_high))),
        RawValue::Int(humidity),
        RawValue::Float(round1(rng.random_range(0.0..rain_high))),
        RawValue::Float(round1(rng.random_range(0.0..80.0))),
        RawValue::Int(rng.random_range(50..=10000)),
        RawValue::Text(weighted_choice(&WEATHER_CONDITIONS, &condition_weights, rng).to_string()),
        RawValue::Float(round1(rng.random_range(950.0..1050.0))),
    ]
}

/// Canonical traffic row in schema order.
///
/// Speed is derived from the drawn vehicle count, and the congestion label
/// from the pair.
pub fn traffic_baseline<R: Rng + ?Sized>(
    ctx: &RecordContext,
    id_offset: i64,
    rng: &mut R,
) -> Vec<RawValue> {
    let area = GENERATOR_AREAS.choose(rng).copied().unwrap_or(GENERATOR_AREAS[0]);
    let vehicles: i64 = if ctx.rush_hour {
        rng.random_range(1000..=5000)
    } else {
        rng.random_range(100..=2000)
    };
    let speed = round1(if vehicles > 3000 {
        rng.random_range(10.0..40.0)
    } else {
        rng.random_range(40.0..120.0)
    });
    let accidents = if ctx.rush_hour {
        *weighted_choice(&[0, 1, 2, 3, 4, 5], &[0.8, 0.1, 0.05, 0.03, 0.01, 0.01], rng)
    } else {
        *weighted_choice(&[0, 1, 2, 3], &[0.95, 0.03, 0.015, 0.005], rng)
    };
    let road = ROAD_CONDITIONS.choose(rng).copied().unwrap_or(ROAD_CONDITIONS[0]);

    vec![
        RawValue::Int(id_offset + ctx.index as i64 + 1),
        RawValue::Text(format_timestamp(&ctx.timestamp, CANONICAL_FORMAT)),
        RawValue::Text(CITY.to_string()),
        RawValue::Text(area.to_string()),
        RawValue::Int(vehicles),
        RawValue::Float(speed),
        RawValue::Int(accidents),
        RawValue::Text(congestion_level(vehicles, speed).to_string()),
        RawValue::Text(road.to_string()),
        RawValue::Int(rng.random_range(50..=10000)),
    ]
}

/// Congestion label implied by vehicle count and average speed.
pub fn congestion_level(vehicles: i64, speed: f64) -> &'static str {
    if vehicles > 4000 && speed < 30.0 {
        "High"
    } else if vehicles > 2000 && speed < 50.0 {
        "Medium"
    } else {
        "Low"
    }
}

/// Append copies of randomly chosen records; half get a colliding identifier.
fn inject_duplicates<R: Rng + ?Sized>(
    domain: Domain,
    records: &mut Vec<RawRecord>,
    config: &GeneratorConfig,
    rng: &mut R,
) -> usize {
    let base = records.len();
    let count = config.duplicate_count().min(base);
    if count == 0 {
        return 0;
    }
    let Some(id_idx) = field_index(domain.schema(), domain.id_column()) else {
        return 0;
    };
    let pool: Vec<RawValue> = records
        .iter()
        .take(config.id_collision_pool.min(base))
        .map(|record| record.values[id_idx].clone())
        .collect();

    let picks = index::sample(rng, base, count).into_vec();
    for pick in picks {
        let mut duplicate = records[pick].clone();
        if rng.random::<f64>() < DUPLICATE_ID_COLLISION_PROBABILITY {
            if let Some(id) = pool.choose(rng) {
                duplicate.values[id_idx] = id.clone();
            }
        }
        records.push(duplicate);
    }
    count
}

fn weighted_choice<'a, T, R: Rng + ?Sized>(items: &'a [T], weights: &[f64], rng: &mut R) -> &'a T {
    let total: f64 = weights.iter().sum();
    let mut draw = rng.random::<f64>() * total;
    for (item, weight) in items.iter().zip(weights) {
        if draw < *weight {
            return item;
        }
        draw -= weight;
    }
    &items[items.len() - 1]
}

/// One decimal place; `-0.0` is normalised to `0.0`.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0 + 0.0
}
