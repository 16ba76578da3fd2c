use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::anomaly::AnomalyModel;
use crate::constants::{cleaner, generator, lake};
use crate::data::Domain;
use crate::errors::PipelineError;
use crate::schema::validate_schema;
use crate::timestamps::parse_timestamp;

/// Controls how many records one domain generates and how they are corrupted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneratorConfig {
    /// Base records before duplicate injection.
    pub records: usize,
    /// Probability that a record is flagged as messy.
    pub issue_probability: f64,
    /// Percentage of `records` appended as duplicates (rounded up).
    pub duplicate_percent: usize,
    /// Leading records whose identifiers are reused for id collisions.
    pub id_collision_pool: usize,
    /// Seed of the final shuffle. Independent of the run-scoped stream.
    pub shuffle_seed: u64,
    /// Timestamp of record index 0.
    pub start: NaiveDateTime,
}

impl GeneratorConfig {
    /// Number of duplicate rows appended: `ceil(records * percent / 100)`.
    pub fn duplicate_count(&self) -> usize {
        (self.records * self.duplicate_percent).div_ceil(100)
    }

    /// Rejects probabilities outside `[0, 1]` and percentages above 100.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.issue_probability) {
            return Err(PipelineError::Configuration(format!(
                "issue probability {} is outside [0, 1]",
                self.issue_probability
            )));
        }
        if self.duplicate_percent > 100 {
            return Err(PipelineError::Configuration(format!(
                "duplicate percent {} exceeds 100",
                self.duplicate_percent
            )));
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            records: generator::DEFAULT_RECORDS,
            issue_probability: generator::ISSUE_PROBABILITY,
            duplicate_percent: generator::DUPLICATE_PERCENT,
            id_collision_pool: generator::ID_COLLISION_POOL,
            shuffle_seed: generator::SHUFFLE_SEED,
            start: parse_timestamp(generator::START_TIME).unwrap_or_default(),
        }
    }
}

/// How the merge plan treats a shared column missing from the precedence table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum CollisionPolicy {
    /// Keep the weather-side value and log a warning.
    #[default]
    PreferWeather,
    /// Refuse to build the plan.
    Strict,
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Directory holding the bronze, silver, and gold tiers.
    pub lake_root: PathBuf,
    /// Seed of the single generation stream (weather first, then traffic).
    pub seed: u64,
    /// Weather generator settings.
    pub weather: GeneratorConfig,
    /// Traffic generator settings.
    pub traffic: GeneratorConfig,
    /// Seed of the cleaner's category resampling stream.
    pub clean_seed: u64,
    /// How unlisted shared merge columns are handled.
    pub collision_policy: CollisionPolicy,
}

impl PipelineConfig {
    /// Generator settings for `domain`.
    pub fn generator(&self, domain: Domain) -> &GeneratorConfig {
        match domain {
            Domain::Weather => &self.weather,
            Domain::Traffic => &self.traffic,
        }
    }

    /// Set the base record count for both domains.
    pub fn with_records(mut self, records: usize) -> Self {
        self.weather.records = records;
        self.traffic.records = records;
        self
    }

    /// Check generator settings, domain schemas, and anomaly tables together.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for domain in Domain::ALL {
            let settings = self.generator(domain);
            settings.validate()?;
            validate_schema(domain.schema())?;
            AnomalyModel::for_domain(domain)
                .with_issue_probability(settings.issue_probability)
                .validate(domain.schema())?;
        }
        if self.lake_root.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(
                "lake root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lake_root: PathBuf::from(lake::DEFAULT_ROOT),
            seed: generator::DEFAULT_SEED,
            weather: GeneratorConfig::default(),
            traffic: GeneratorConfig::default(),
            clean_seed: cleaner::DEFAULT_SEED,
            collision_policy: CollisionPolicy::default(),
        }
    }
}
