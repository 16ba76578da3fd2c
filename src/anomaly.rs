//! Declarative corruption rules per (domain, field).
//!
//! A record is first flagged as messy with the model's issue probability.
//! Only flagged records consult the field rules below. Each field lists
//! ordered rules, each rule firing with its own probability and then picking
//! one corruption by relative weight. Rules are tried either as a cascade
//! (one draw per rule until one fires) or as bands of a single draw.

use chrono::NaiveDateTime;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::constants::generator::{
    INVALID_CONGESTION, INVALID_SEASONS, ISSUE_PROBABILITY, NON_NUMERIC_VISIBILITY,
    TRAFFIC_ALT_TIMESTAMP_FORMATS, TRAFFIC_INVALID_TIMESTAMPS, WEATHER_ALT_TIMESTAMP_FORMATS,
    WEATHER_INVALID_TIMESTAMPS,
};
use crate::constants::{columns, timestamps::ACCEPTED_FORMATS};
use crate::data::{Domain, RawValue};
use crate::errors::PipelineError;
use crate::schema::{FieldKind, FieldSpec, field_index};
use crate::timestamps::{format_timestamp, parse_timestamp};

/// A way of corrupting one canonical value.
#[derive(Clone, Copy, Debug)]
pub enum Corruption {
    /// Replace with a missing value.
    Null,
    /// Replace with one of a fixed set of out-of-range integers.
    OutlierChoice(&'static [i64]),
    /// Replace with a uniform float from `[low, high)`.
    OutlierRange {
        /// Inclusive lower end.
        low: f64,
        /// Exclusive upper end.
        high: f64,
    },
    /// Replace with a uniform integer from `[low, high]`.
    OutlierIntRange {
        /// Inclusive lower end.
        low: i64,
        /// Inclusive upper end.
        high: i64,
    },
    /// Re-encode the record timestamp with another valid format.
    AlternateTimestamp(&'static [&'static str]),
    /// Replace the timestamp with an unparsable sentinel.
    InvalidTimestamp(&'static [&'static str]),
    /// Put a string into a numeric column.
    NonNumeric(&'static [&'static str]),
    /// Replace a label with one outside the valid set.
    InvalidLabel(&'static [&'static str]),
}

impl Corruption {
    /// Produce the corrupted value for a record observed at `timestamp`.
    pub fn apply<R: Rng + ?Sized>(&self, timestamp: &NaiveDateTime, rng: &mut R) -> RawValue {
        match self {
            Corruption::Null => RawValue::Null,
            Corruption::OutlierChoice(choices) => choices
                .choose(rng)
                .map(|value| RawValue::Int(*value))
                .unwrap_or(RawValue::Null),
            Corruption::OutlierRange { low, high } => RawValue::Float(rng.random_range(*low..*high)),
            Corruption::OutlierIntRange { low, high } => {
                RawValue::Int(rng.random_range(*low..=*high))
            }
            Corruption::AlternateTimestamp(formats) => formats
                .choose(rng)
                .map(|format| RawValue::Text(format_timestamp(timestamp, format)))
                .unwrap_or(RawValue::Null),
            Corruption::InvalidTimestamp(choices)
            | Corruption::NonNumeric(choices)
            | Corruption::InvalidLabel(choices) => choices
                .choose(rng)
                .map(|value| RawValue::Text((*value).to_string()))
                .unwrap_or(RawValue::Null),
        }
    }

    fn choices_len(&self) -> usize {
        match self {
            Corruption::Null
            | Corruption::OutlierRange { .. }
            | Corruption::OutlierIntRange { .. } => 1,
            Corruption::OutlierChoice(choices) => choices.len(),
            Corruption::AlternateTimestamp(choices)
            | Corruption::InvalidTimestamp(choices)
            | Corruption::NonNumeric(choices)
            | Corruption::InvalidLabel(choices) => choices.len(),
        }
    }
}

/// A corruption with its relative weight inside a rule.
#[derive(Clone, Copy, Debug)]
pub struct WeightedCorruption {
    /// Corruption to apply.
    pub corruption: Corruption,
    /// Relative weight among the rule's outcomes.
    pub weight: f64,
}

/// One rule: fires with `probability`, then picks an outcome by weight.
#[derive(Clone, Copy, Debug)]
pub struct AnomalyRule {
    /// Chance the rule fires.
    pub probability: f64,
    /// Outcomes picked by weight once the rule fires.
    pub outcomes: &'static [WeightedCorruption],
}

/// How a field's rules consume random draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Independent draw per rule, first hit wins.
    Cascade,
    /// One draw, rules occupy consecutive probability bands.
    Banded,
}

/// All rules for one field.
#[derive(Clone, Copy, Debug)]
pub struct FieldAnomalies {
    /// Field the rules corrupt.
    pub field: &'static str,
    /// How the rules consume draws.
    pub mode: DrawMode,
    /// Rules in priority order.
    pub rules: &'static [AnomalyRule],
}

const fn only(corruption: Corruption) -> WeightedCorruption {
    WeightedCorruption {
        corruption,
        weight: 1.0,
    }
}

const fn rule(probability: f64, outcomes: &'static [WeightedCorruption]) -> AnomalyRule {
    AnomalyRule {
        probability,
        outcomes,
    }
}

const fn cascade(field: &'static str, rules: &'static [AnomalyRule]) -> FieldAnomalies {
    FieldAnomalies {
        field,
        mode: DrawMode::Cascade,
        rules,
    }
}

const NULL: &[WeightedCorruption] = &[only(Corruption::Null)];

/// Weather corruption table.
pub const WEATHER_ANOMALIES: &[FieldAnomalies] = &[
    cascade(columns::WEATHER_ID, &[rule(0.10, NULL)]),
    FieldAnomalies {
        field: columns::DATE_TIME,
        mode: DrawMode::Banded,
        rules: &[
            rule(0.05, NULL),
            rule(
                0.05,
                &[only(Corruption::InvalidTimestamp(&WEATHER_INVALID_TIMESTAMPS))],
            ),
            rule(
                0.10,
                &[only(Corruption::AlternateTimestamp(&WEATHER_ALT_TIMESTAMP_FORMATS))],
            ),
        ],
    },
    cascade(columns::CITY, &[rule(0.05, NULL)]),
    cascade(
        columns::SEASON,
        &[rule(
            0.10,
            &[
                only(Corruption::Null),
                only(Corruption::InvalidLabel(&INVALID_SEASONS)),
            ],
        )],
    ),
    cascade(
        columns::TEMPERATURE_C,
        &[
            rule(0.05, &[only(Corruption::OutlierChoice(&[-30, 60, 100]))]),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::HUMIDITY,
        &[
            rule(0.05, &[only(Corruption::OutlierChoice(&[-10, 150, 200]))]),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::RAIN_MM,
        &[
            rule(
                0.05,
                &[only(Corruption::OutlierRange {
                    low: 120.0,
                    high: 300.0,
                })],
            ),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::WIND_SPEED_KMH,
        &[
            rule(
                0.05,
                &[only(Corruption::OutlierRange {
                    low: 200.0,
                    high: 500.0,
                })],
            ),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::VISIBILITY_M,
        &[
            rule(0.05, &[only(Corruption::OutlierChoice(&[50000]))]),
            rule(0.05, &[only(Corruption::NonNumeric(&NON_NUMERIC_VISIBILITY))]),
            rule(0.10, NULL),
        ],
    ),
    cascade(columns::WEATHER_CONDITION, &[rule(0.10, NULL)]),
    cascade(columns::AIR_PRESSURE_HPA, &[rule(0.10, NULL)]),
];

/// Traffic corruption table.
pub const TRAFFIC_ANOMALIES: &[FieldAnomalies] = &[
    cascade(columns::TRAFFIC_ID, &[rule(0.10, NULL)]),
    FieldAnomalies {
        field: columns::DATE_TIME,
        mode: DrawMode::Banded,
        rules: &[
            rule(0.05, NULL),
            rule(
                0.05,
                &[only(Corruption::InvalidTimestamp(&TRAFFIC_INVALID_TIMESTAMPS))],
            ),
            rule(
                0.10,
                &[only(Corruption::AlternateTimestamp(&TRAFFIC_ALT_TIMESTAMP_FORMATS))],
            ),
        ],
    },
    cascade(columns::CITY, &[rule(0.05, NULL)]),
    cascade(columns::AREA, &[rule(0.10, NULL)]),
    cascade(
        columns::VEHICLE_COUNT,
        &[
            rule(
                0.05,
                &[only(Corruption::OutlierIntRange {
                    low: 20000,
                    high: 50000,
                })],
            ),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::AVG_SPEED_KMH,
        &[
            rule(
                0.05,
                &[only(Corruption::OutlierRange {
                    low: -50.0,
                    high: -1.0,
                })],
            ),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::ACCIDENT_COUNT,
        &[
            rule(
                0.02,
                &[only(Corruption::OutlierIntRange { low: 50, high: 100 })],
            ),
            rule(0.10, NULL),
        ],
    ),
    cascade(
        columns::CONGESTION_LEVEL,
        &[
            rule(0.10, NULL),
            rule(0.05, &[only(Corruption::InvalidLabel(&INVALID_CONGESTION))]),
        ],
    ),
    cascade(columns::ROAD_CONDITION, &[rule(0.10, NULL)]),
    cascade(
        columns::VISIBILITY_M,
        &[
            rule(0.05, &[only(Corruption::OutlierChoice(&[10, 100000]))]),
            rule(0.10, NULL),
        ],
    ),
];

/// The anomaly table for one domain plus the per-record issue probability.
#[derive(Clone, Copy, Debug)]
pub struct AnomalyModel {
    domain: Domain,
    issue_probability: f64,
    fields: &'static [FieldAnomalies],
}

impl AnomalyModel {
    /// Model with the standard table and issue probability for `domain`.
    pub fn for_domain(domain: Domain) -> Self {
        let fields = match domain {
            Domain::Weather => WEATHER_ANOMALIES,
            Domain::Traffic => TRAFFIC_ANOMALIES,
        };
        Self {
            domain,
            issue_probability: ISSUE_PROBABILITY,
            fields,
        }
    }

    /// Override the per-record issue probability.
    pub fn with_issue_probability(mut self, probability: f64) -> Self {
        self.issue_probability = probability;
        self
    }

    /// Domain the model corrupts.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Chance a record is flagged as messy.
    pub fn issue_probability(&self) -> f64 {
        self.issue_probability
    }

    /// Rule set for `field`, if the field is ever corrupted.
    pub fn rules_for(&self, field: &str) -> Option<&'static FieldAnomalies> {
        self.fields.iter().find(|entry| entry.field == field)
    }

    /// Draw the per-record "has issues" flag.
    pub fn draw_has_issues<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random::<f64>() < self.issue_probability
    }

    /// Pick the corruption to apply to `field` of a flagged record, if any.
    pub fn select<R: Rng + ?Sized>(&self, field: &str, rng: &mut R) -> Option<Corruption> {
        let entry = self.rules_for(field)?;
        let fired = match entry.mode {
            DrawMode::Cascade => entry
                .rules
                .iter()
                .find(|rule| rng.random::<f64>() < rule.probability),
            DrawMode::Banded => {
                let draw = rng.random::<f64>();
                let mut upper = 0.0;
                entry.rules.iter().find(|rule| {
                    upper += rule.probability;
                    draw < upper
                })
            }
        }?;
        pick_outcome(fired.outcomes, rng)
    }

    /// Marginal probability that a generated record has `field` corrupted.
    pub fn expected_rate(&self, field: &str) -> f64 {
        let Some(entry) = self.rules_for(field) else {
            return 0.0;
        };
        let fire: f64 = match entry.mode {
            DrawMode::Banded => entry.rules.iter().map(|rule| rule.probability).sum(),
            DrawMode::Cascade => {
                let mut miss = 1.0;
                let mut hit = 0.0;
                for rule in entry.rules {
                    hit += miss * rule.probability;
                    miss *= 1.0 - rule.probability;
                }
                hit
            }
        };
        self.issue_probability * fire
    }

    /// Check the table against the domain schema.
    pub fn validate(&self, schema: &[FieldSpec]) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.issue_probability) {
            return Err(PipelineError::Configuration(format!(
                "{} issue probability {} is outside [0, 1]",
                self.domain, self.issue_probability
            )));
        }
        for entry in self.fields {
            let Some(idx) = field_index(schema, entry.field) else {
                return Err(PipelineError::Configuration(format!(
                    "{} anomaly rule targets unknown column '{}'",
                    self.domain, entry.field
                )));
            };
            let kind = schema[idx].kind;
            let mut band_total = 0.0;
            for rule in entry.rules {
                if !(0.0..=1.0).contains(&rule.probability) {
                    return Err(PipelineError::Configuration(format!(
                        "{}.{} rule probability {} is outside [0, 1]",
                        self.domain, entry.field, rule.probability
                    )));
                }
                band_total += rule.probability;
                if rule.outcomes.is_empty()
                    || rule
                        .outcomes
                        .iter()
                        .any(|outcome| !(outcome.weight > 0.0) || outcome.corruption.choices_len() == 0)
                {
                    return Err(PipelineError::Configuration(format!(
                        "{}.{} rule has no usable outcome",
                        self.domain, entry.field
                    )));
                }
                for outcome in rule.outcomes {
                    check_kind(self.domain, entry.field, kind, &outcome.corruption)?;
                }
            }
            if entry.mode == DrawMode::Banded && band_total > 1.0 {
                return Err(PipelineError::Configuration(format!(
                    "{}.{} banded rules sum to {band_total} > 1",
                    self.domain, entry.field
                )));
            }
        }
        Ok(())
    }
}

fn pick_outcome<R: Rng + ?Sized>(
    outcomes: &'static [WeightedCorruption],
    rng: &mut R,
) -> Option<Corruption> {
    if outcomes.len() == 1 {
        return outcomes.first().map(|outcome| outcome.corruption);
    }
    let total: f64 = outcomes.iter().map(|outcome| outcome.weight).sum();
    let mut draw = rng.random::<f64>() * total;
    for outcome in outcomes {
        if draw < outcome.weight {
            return Some(outcome.corruption);
        }
        draw -= outcome.weight;
    }
    outcomes.last().map(|outcome| outcome.corruption)
}

fn check_kind(
    domain: Domain,
    field: &str,
    kind: FieldKind,
    corruption: &Corruption,
) -> Result<(), PipelineError> {
    let compatible = match corruption {
        Corruption::Null => true,
        Corruption::OutlierChoice(_)
        | Corruption::OutlierRange { .. }
        | Corruption::OutlierIntRange { .. }
        | Corruption::NonNumeric(_) => matches!(kind, FieldKind::Measurement(_)),
        Corruption::AlternateTimestamp(formats) => {
            matches!(kind, FieldKind::Timestamp)
                && formats.iter().all(|format| ACCEPTED_FORMATS.contains(format))
        }
        Corruption::InvalidTimestamp(sentinels) => {
            matches!(kind, FieldKind::Timestamp)
                && sentinels.iter().all(|value| parse_timestamp(value).is_none())
        }
        Corruption::InvalidLabel(values) => match kind {
            FieldKind::Category(valid) => values.iter().all(|value| !valid.contains(value)),
            FieldKind::Season => values
                .iter()
                .all(|value| crate::data::Season::parse(value).is_none()),
            _ => false,
        },
    };
    if compatible {
        Ok(())
    } else {
        Err(PipelineError::Configuration(format!(
            "{domain}.{field} declares a corruption that does not fit its field kind: {corruption:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn standard_tables_validate_against_schemas() {
        for domain in Domain::ALL {
            AnomalyModel::for_domain(domain)
                .validate(domain.schema())
                .expect("standard anomaly table");
        }
    }

    #[test]
    fn expected_rates_follow_rule_shapes() {
        let weather = AnomalyModel::for_domain(Domain::Weather);
        // Banded: 0.05 + 0.05 + 0.10 of flagged records.
        assert!((weather.expected_rate("date_time") - 0.30 * 0.20).abs() < 1e-12);
        // Cascade: 0.05 + 0.95 * 0.10.
        assert!((weather.expected_rate("temperature_c") - 0.30 * 0.145).abs() < 1e-12);
        assert_eq!(weather.expected_rate("no_such_column"), 0.0);
        let quiet = weather.with_issue_probability(0.0);
        assert_eq!(quiet.expected_rate("temperature_c"), 0.0);
    }

    #[test]
    fn select_never_fires_for_unlisted_fields() {
        let model = AnomalyModel::for_domain(Domain::Traffic);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(model.select("humidity", &mut rng).is_none());
        }
    }

    #[test]
    fn observed_selection_rate_tracks_rule_probability() {
        let model = AnomalyModel::for_domain(Domain::Weather);
        let mut rng = StdRng::seed_from_u64(11);
        let trials = 20_000;
        let fired = (0..trials)
            .filter(|_| model.select("visibility_m", &mut rng).is_some())
            .count();
        // 1 - 0.95 * 0.95 * 0.90
        let expected = 1.0 - 0.95 * 0.95 * 0.90;
        let observed = fired as f64 / trials as f64;
        assert!((observed - expected).abs() < 0.02, "observed {observed}");
    }

    #[test]
    fn season_rule_splits_between_null_and_invalid_label() {
        let model = AnomalyModel::for_domain(Domain::Weather);
        let mut rng = StdRng::seed_from_u64(3);
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut nulls = 0;
        let mut labels = 0;
        for _ in 0..5_000 {
            if let Some(corruption) = model.select("season", &mut rng) {
                match corruption.apply(&ts, &mut rng) {
                    RawValue::Null => nulls += 1,
                    RawValue::Text(label) => {
                        assert!(INVALID_SEASONS.contains(&label.as_str()));
                        labels += 1;
                    }
                    other => panic!("unexpected season corruption {other:?}"),
                }
            }
        }
        assert!(nulls > 0 && labels > 0);
    }

    #[test]
    fn corruptions_produce_declared_shapes() {
        let mut rng = StdRng::seed_from_u64(5);
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap();
        match (Corruption::OutlierIntRange {
            low: 20000,
            high: 50000,
        })
        .apply(&ts, &mut rng)
        {
            RawValue::Int(value) => assert!((20000..=50000).contains(&value)),
            other => panic!("unexpected {other:?}"),
        }
        match (Corruption::OutlierRange {
            low: -50.0,
            high: -1.0,
        })
        .apply(&ts, &mut rng)
        {
            RawValue::Float(value) => assert!((-50.0..-1.0).contains(&value)),
            other => panic!("unexpected {other:?}"),
        }
        match Corruption::AlternateTimestamp(&TRAFFIC_ALT_TIMESTAMP_FORMATS).apply(&ts, &mut rng) {
            RawValue::Text(text) => assert_eq!(parse_timestamp(&text), Some(ts)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validation_rejects_label_corruption_on_numeric_field() {
        const BAD: &[FieldAnomalies] = &[cascade(
            columns::TEMPERATURE_C,
            &[rule(0.1, &[only(Corruption::InvalidLabel(&["Hot"]))])],
        )];
        let model = AnomalyModel {
            domain: Domain::Weather,
            issue_probability: 0.3,
            fields: BAD,
        };
        assert!(matches!(
            model.validate(Domain::Weather.schema()),
            Err(PipelineError::Configuration(_))
        ));
    }
}
