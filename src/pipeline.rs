//! End-to-end batch runs over the local lake.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::info;

use crate::artifacts::{
    decode_clean_parquet, decode_raw_csv, encode_clean_parquet, encode_merged_parquet,
    encode_raw_csv,
};
use crate::cleaner::{CleaningReport, clean_dataset};
use crate::config::PipelineConfig;
use crate::constants::lake;
use crate::data::{CleanDataset, Domain, MergedDataset, RawDataset};
use crate::errors::PipelineError;
use crate::generator::generate_dataset;
use crate::merge::{MergePlan, MergeReport, merge};
use crate::metrics::{DatasetProfile, profile_dataset};
use crate::transport::{LakeStore, Tier};
use crate::types::PathString;

/// Everything a full run produced, serialized to the run summary.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Configuration the run used.
    pub config: PipelineConfig,
    /// Raw profiles, weather first.
    pub profiles: Vec<DatasetProfile>,
    /// Cleaning reports, weather first.
    pub cleaning: Vec<CleaningReport>,
    /// Merge counters.
    pub merge: MergeReport,
    /// Lake-relative paths of every artifact after the run.
    pub artifacts: Vec<PathString>,
}

/// Generate, clean, and merge stages wired to a lake store.
///
/// Each stage reads the previous stage's artifacts from disk, so stages can
/// also be run one at a time.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    store: LakeStore,
    plan: MergePlan,
}

impl Pipeline {
    /// Validate `config` and build the merge plan up front.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let plan = MergePlan::standard(config.collision_policy)?;
        let store = LakeStore::new(config.lake_root.clone());
        Ok(Self {
            config,
            store,
            plan,
        })
    }

    /// Validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Lake the stages read and write.
    pub fn store(&self) -> &LakeStore {
        &self.store
    }

    /// Merge plan built from the collision policy.
    pub fn plan(&self) -> &MergePlan {
        &self.plan
    }

    /// Bytes of an object written by an earlier stage.
    fn read_object(&self, tier: Tier, name: &str) -> Result<Vec<u8>, PipelineError> {
        if !self.store.exists(tier, name) {
            return Err(PipelineError::ArtifactUnreadable {
                artifact: name.to_string(),
                reason: format!(
                    "not found in {} tier under {}",
                    tier.dir_name(),
                    self.store.root().display()
                ),
            });
        }
        self.store.read_bytes(tier, name)
    }

    /// Generate both raw datasets from one seeded stream and write them to bronze.
    pub fn generate(&self) -> Result<Vec<RawDataset>, PipelineError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut datasets = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let dataset = generate_dataset(domain, self.config.generator(domain), &mut rng)?;
            let bytes = encode_raw_csv(&dataset)?;
            let path = self
                .store
                .write_bytes(Tier::Bronze, domain.raw_object(), &bytes)?;
            info!(
                "[wxtraffic:generate] wrote {} rows to {}",
                dataset.len(),
                path.display()
            );
            datasets.push(dataset);
        }
        Ok(datasets)
    }

    /// Read one raw artifact from bronze.
    pub fn load_raw(&self, domain: Domain) -> Result<RawDataset, PipelineError> {
        let name = domain.raw_object();
        decode_raw_csv(name, &self.read_object(Tier::Bronze, name)?, domain)
    }

    /// Profile both raw artifacts.
    pub fn profile(&self) -> Result<Vec<DatasetProfile>, PipelineError> {
        Domain::ALL
            .iter()
            .map(|domain| self.load_raw(*domain).map(|raw| profile_dataset(&raw)))
            .collect()
    }

    /// Clean both raw artifacts and write them to silver.
    pub fn clean(&self) -> Result<Vec<CleaningReport>, PipelineError> {
        let mut rng = StdRng::seed_from_u64(self.config.clean_seed);
        let mut reports = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let raw = self.load_raw(domain)?;
            let outcome = clean_dataset(&raw, &mut rng);
            let path = self.store.write_bytes(
                Tier::Silver,
                domain.clean_object(),
                &encode_clean_parquet(&outcome.dataset)?,
            )?;
            info!(
                "[wxtraffic:clean] wrote {} rows to {}",
                outcome.dataset.len(),
                path.display()
            );
            reports.push(outcome.report);
        }
        Ok(reports)
    }

    /// Read one cleaned artifact from silver.
    pub fn load_clean(&self, domain: Domain) -> Result<CleanDataset, PipelineError> {
        let name = domain.clean_object();
        decode_clean_parquet(name, self.read_object(Tier::Silver, name)?, domain)
    }

    /// Join the silver tables and write the result to gold.
    pub fn merge(&self) -> Result<(MergedDataset, MergeReport), PipelineError> {
        let weather = self.load_clean(Domain::Weather)?;
        let traffic = self.load_clean(Domain::Traffic)?;
        let outcome = merge(&weather, &traffic, &self.plan)?;
        let path = self.store.write_bytes(
            Tier::Gold,
            lake::MERGED,
            &encode_merged_parquet(&outcome.dataset)?,
        )?;
        info!(
            "[wxtraffic:merge] wrote {} rows to {}",
            outcome.dataset.len(),
            path.display()
        );
        Ok((outcome.dataset, outcome.report))
    }

    /// Generate, profile, clean, and merge, then write the JSON run summary.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.generate()?;
        let profiles = self.profile()?;
        let cleaning = self.clean()?;
        let (_, merge) = self.merge()?;
        let mut artifacts = Vec::new();
        for tier in Tier::ALL {
            artifacts.extend(self.store.list(tier)?);
        }
        let summary = RunSummary {
            config: self.config.clone(),
            profiles,
            cleaning,
            merge,
            artifacts,
        };
        let path = self
            .store
            .write_summary(&serde_json::to_vec_pretty(&summary)?)?;
        info!("[wxtraffic:run] summary written to {}", path.display());
        Ok(summary)
    }
}
