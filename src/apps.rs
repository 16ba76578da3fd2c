use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, error::ErrorKind};

use crate::cleaner::CleaningReport;
use crate::config::{CollisionPolicy, PipelineConfig};
use crate::constants::{generator, lake};
use crate::merge::MergeReport;
use crate::metrics::DatasetProfile;
use crate::pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(
    name = "wxtraffic",
    disable_help_subcommand = true,
    about = "Generate, clean, and merge synthetic London weather and traffic data",
    long_about = "Generate intentionally messy weather and traffic observations, repair them with per-field policies, and join them on (hour, city) into one table.",
    after_help = "Artifacts are written under the lake root: bronze/ (raw CSV), silver/ (clean parquet), gold/ (merged parquet)."
)]
struct WxTrafficCli {
    #[arg(
        long = "lake-root",
        value_name = "DIR",
        default_value = lake::DEFAULT_ROOT,
        global = true,
        help = "Directory holding the bronze, silver, and gold tiers"
    )]
    lake_root: PathBuf,
    #[arg(
        long,
        default_value_t = generator::DEFAULT_RECORDS,
        value_parser = parse_positive_usize,
        global = true,
        help = "Base records generated per domain before duplicates"
    )]
    records: usize,
    #[arg(
        long,
        default_value_t = generator::DEFAULT_SEED,
        global = true,
        help = "Seed of the generation stream"
    )]
    seed: u64,
    #[arg(
        long = "strict-collisions",
        global = true,
        help = "Fail when both merge inputs share a column with no resolution rule"
    )]
    strict_collisions: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write raw weather and traffic CSVs to bronze.
    Generate,
    /// Clean bronze artifacts into silver parquet tables.
    Clean,
    /// Join silver tables into the gold merged table.
    Merge,
    /// Generate, clean, merge, and write the run summary.
    Run,
    /// Print data-quality profiles of the bronze artifacts.
    Profile,
}

impl WxTrafficCli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            lake_root: self.lake_root.clone(),
            seed: self.seed,
            collision_policy: if self.strict_collisions {
                CollisionPolicy::Strict
            } else {
                CollisionPolicy::PreferWeather
            },
            ..PipelineConfig::default()
        }
        .with_records(self.records)
    }
}

/// Parse `args` and run the selected stage.
pub fn run_wxtraffic<I>(args: I) -> Result<(), Box<dyn Error>>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    let Some(cli) = parse_cli::<WxTrafficCli, _>(args)? else {
        return Ok(());
    };
    let pipeline = Pipeline::new(cli.pipeline_config())?;
    match cli.command {
        Command::Generate => {
            for dataset in pipeline.generate()? {
                println!("{}: {} raw rows", dataset.domain, dataset.len());
            }
        }
        Command::Clean => {
            for report in pipeline.clean()? {
                print_cleaning_report(&report);
            }
        }
        Command::Merge => {
            let (_, report) = pipeline.merge()?;
            print_merge_report(&report);
        }
        Command::Profile => {
            for profile in pipeline.profile()? {
                print_profile(&profile);
            }
        }
        Command::Run => {
            let summary = pipeline.run()?;
            for profile in &summary.profiles {
                print_profile(profile);
            }
            for report in &summary.cleaning {
                print_cleaning_report(report);
            }
            print_merge_report(&summary.merge);
            println!("artifacts:");
            for artifact in &summary.artifacts {
                println!("  {artifact}");
            }
            println!(
                "summary: {}",
                pipeline.store().summary_path().display()
            );
        }
    }
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw.parse::<usize>().map_err(|_| {
        format!(
            "Could not parse --records value '{}' as a positive integer",
            raw
        )
    })?;
    if parsed == 0 {
        return Err("--records must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn print_profile(profile: &DatasetProfile) {
    println!("=== {} raw profile ===", profile.domain);
    println!("rows: {}", profile.rows);
    println!("exact duplicates: {}", profile.duplicate_rows);
    println!("missing values:");
    for (column, count) in &profile.null_counts {
        println!("  {column:<18} {count}");
    }
    for (name, count) in &profile.anomalies {
        println!("{name}: {count}");
    }
}

fn print_cleaning_report(report: &CleaningReport) {
    println!(
        "{}: {} -> {} rows (duplicates={}, missing_critical={}, clipped={}, resampled={})",
        report.domain,
        report.rows_in,
        report.rows_out,
        report.duplicates_removed + report.repaired_duplicates_removed,
        report.dropped_missing_critical,
        report.values_clipped,
        report.categories_resampled
    );
}

fn print_merge_report(report: &MergeReport) {
    println!(
        "merged: weather={} traffic={} keys={} rows={}",
        report.weather_rows, report.traffic_rows, report.matched_keys, report.rows_out
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cli_flags_map_to_config() {
        let cli = WxTrafficCli::try_parse_from([
            "wxtraffic",
            "run",
            "--records",
            "300",
            "--seed",
            "9",
            "--lake-root",
            "/tmp/lake",
            "--strict-collisions",
        ])
        .unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.weather.records, 300);
        assert_eq!(config.traffic.records, 300);
        assert_eq!(config.seed, 9);
        assert_eq!(config.lake_root, PathBuf::from("/tmp/lake"));
        assert_eq!(config.collision_policy, CollisionPolicy::Strict);
        assert!(matches!(cli.command, Command::Run));
    }

    #[test]
    fn zero_records_is_rejected() {
        assert!(WxTrafficCli::try_parse_from(["wxtraffic", "generate", "--records", "0"]).is_err());
    }

    #[test]
    fn help_returns_without_running() {
        assert!(parse_cli::<WxTrafficCli, _>(["wxtraffic", "--help"]).unwrap().is_none());
    }

    #[test]
    fn generate_then_profile_through_cli() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        run_wxtraffic(["wxtraffic", "generate", "--records", "50", "--lake-root", root.as_str()]).unwrap();
        run_wxtraffic(["wxtraffic", "profile", "--records", "50", "--lake-root", root.as_str()]).unwrap();
        assert!(dir.path().join("bronze").join("weather_data_raw.csv").is_file());
    }
}
