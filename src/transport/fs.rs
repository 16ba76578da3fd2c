use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::constants::lake;
use crate::errors::PipelineError;
use crate::types::PathString;

/// Storage tier of the local lake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    /// Raw CSV artifacts.
    Bronze,
    /// Cleaned per-domain tables.
    Silver,
    /// Merged table.
    Gold,
}

impl Tier {
    /// Every tier, in pipeline order.
    pub const ALL: [Tier; 3] = [Tier::Bronze, Tier::Silver, Tier::Gold];

    /// Directory name under the lake root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Bronze => lake::BRONZE_DIR,
            Tier::Silver => lake::SILVER_DIR,
            Tier::Gold => lake::GOLD_DIR,
        }
    }
}

/// Filesystem lake rooted at a directory with one subdirectory per tier.
#[derive(Clone, Debug)]
pub struct LakeStore {
    root: PathBuf,
}

impl LakeStore {
    /// Create a store rooted at `root`. Nothing is created on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lake root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of `tier`.
    pub fn tier_dir(&self, tier: Tier) -> PathBuf {
        self.root.join(tier.dir_name())
    }

    /// Path of `name` inside `tier`.
    pub fn object_path(&self, tier: Tier, name: &str) -> PathBuf {
        self.tier_dir(tier).join(name)
    }

    /// Path of the run summary, stored beside the tiers.
    pub fn summary_path(&self) -> PathBuf {
        self.root.join(lake::RUN_SUMMARY)
    }

    /// Create the tier directory if missing and return it.
    pub fn ensure_tier(&self, tier: Tier) -> Result<PathBuf, PipelineError> {
        let dir = self.tier_dir(tier);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// True when object `name` is a file in `tier`.
    pub fn exists(&self, tier: Tier, name: &str) -> bool {
        self.object_path(tier, name).is_file()
    }

    /// Files in `tier`, as sorted root-relative paths with `/` separators.
    ///
    /// A tier that was never written lists as empty.
    pub fn list(&self, tier: Tier) -> Result<Vec<PathString>, PipelineError> {
        let dir = self.tier_dir(tier);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| PipelineError::Io(err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let parts: Vec<String> = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy().into_owned())
                .collect();
            entries.push(parts.join("/"));
        }
        entries.sort();
        Ok(entries)
    }

    /// Write `bytes` as object `name`, creating the tier directory first.
    pub fn write_bytes(
        &self,
        tier: Tier,
        name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, PipelineError> {
        self.ensure_tier(tier)?;
        let path = self.object_path(tier, name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Read object `name` from `tier`.
    pub fn read_bytes(&self, tier: Tier, name: &str) -> Result<Vec<u8>, PipelineError> {
        Ok(fs::read(self.object_path(tier, name))?)
    }

    /// Write the run summary beside the tiers.
    pub fn write_summary(&self, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.root)?;
        let path = self.summary_path();
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tiers_map_to_named_directories() {
        let store = LakeStore::new("/lake");
        assert_eq!(store.tier_dir(Tier::Bronze), PathBuf::from("/lake/bronze"));
        assert_eq!(
            store.object_path(Tier::Gold, "merged_dataset.parquet"),
            PathBuf::from("/lake/gold/merged_dataset.parquet")
        );
        assert_eq!(
            store.summary_path(),
            PathBuf::from("/lake/dataset_summary.json")
        );
    }

    #[test]
    fn write_read_and_list_objects() {
        let dir = tempdir().unwrap();
        let store = LakeStore::new(dir.path());
        assert!(store.list(Tier::Silver).unwrap().is_empty());

        store.write_bytes(Tier::Bronze, "b.csv", b"x").unwrap();
        store.write_bytes(Tier::Bronze, "a.csv", b"hello").unwrap();
        assert_eq!(store.read_bytes(Tier::Bronze, "a.csv").unwrap(), b"hello");
        assert!(store.exists(Tier::Bronze, "a.csv"));
        assert!(!store.exists(Tier::Gold, "a.csv"));
        assert_eq!(
            store.list(Tier::Bronze).unwrap(),
            vec!["bronze/a.csv".to_string(), "bronze/b.csv".to_string()]
        );
    }

    #[test]
    fn missing_object_is_io_error() {
        let dir = tempdir().unwrap();
        let store = LakeStore::new(dir.path());
        assert!(matches!(
            store.read_bytes(Tier::Gold, "merged_dataset.parquet"),
            Err(PipelineError::Io(_))
        ));
    }
}
