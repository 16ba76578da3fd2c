/// Local filesystem lake with bronze, silver, and gold tiers.
pub mod fs;

pub use fs::{LakeStore, Tier};
