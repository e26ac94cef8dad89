//! Command-line interface of the `pqc` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pqc_common::{OutputFormat, PartitionKey};
use pqc_config::config::MIB;
use pqc_config::{
    load_file, parse_byte_size, resolve_config, validate, ConfigError, ConfigPaths, ConfigSource,
    ConsolidatorConfig, ValidationError,
};
use thiserror::Error;
use tracing::{debug, error};

use crate::exit_codes::ExitCode;
use crate::logging::LogFormat;
use crate::orchestrator::Consolidator;
use crate::store::{ObjectStoreRemote, StoreError};

/// Consolidate small Parquet files in date-partitioned storage.
#[derive(Debug, Parser)]
#[command(name = "pqc", version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML, or JSON with a .json extension).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report format on stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Debug logging (ignored when RUST_LOG is set).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Consolidate partitions (or plan only with --dry-run).
    Consolidate(ConsolidateArgs),
    /// Report what consolidation would do, without changing anything.
    Analyze(AnalyzeArgs),
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Args)]
pub struct ConsolidateArgs {
    #[command(flatten)]
    pub partitions: PartitionArgs,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// List and plan only; no downloads, uploads or deletions.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub partitions: PartitionArgs,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show(OverrideArgs),
    /// Validate a config file, or the resolved configuration.
    Validate {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

/// Which partitions to process.
#[derive(Debug, Clone, Default, Args)]
pub struct PartitionArgs {
    /// Partition date (YYYY-MM-DD); the newest day when combined with --days-back.
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Also process the N days before --date.
    #[arg(long, value_name = "N", requires = "date")]
    pub days_back: Option<u32>,

    /// Partition key to process (repeatable).
    #[arg(long = "partition", value_name = "KEY")]
    pub partitions: Vec<String>,
}

impl PartitionArgs {
    /// Partitions in processing order: the date range first, then explicit keys.
    pub fn resolve(&self) -> pqc_common::Result<Vec<PartitionKey>> {
        let mut keys = match &self.date {
            Some(date) => PartitionKey::date_range(date, self.days_back.unwrap_or(0))?,
            None => Vec::new(),
        };
        for raw in &self.partitions {
            let key = PartitionKey::new(raw.as_str())?;
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Err(pqc_common::Error::Config(
                "no partition given: use --date or --partition".to_string(),
            ));
        }
        Ok(keys)
    }
}

/// Per-invocation overrides of the resolved configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct OverrideArgs {
    /// Store URL (s3://bucket/prefix, gs://bucket, az://container, file:///dir) or local directory.
    #[arg(long, env = "PQC_STORE_ROOT", value_name = "URL")]
    pub store_root: Option<String>,

    /// Dataset directory under the store root.
    #[arg(long, value_name = "PATH")]
    pub base_path: Option<String>,

    /// Target output file size; a bare number is MiB (e.g. 128, 1GiB).
    #[arg(long, value_name = "SIZE")]
    pub target_size: Option<String>,

    /// Minimum file count before a partition is consolidated.
    #[arg(long, value_name = "N")]
    pub min_files: Option<usize>,

    /// Parent directory for scratch space.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Files at or below this size are treated as still being written (e.g. 1024, 4k).
    #[arg(long, value_name = "SIZE")]
    pub in_flight_threshold: Option<String>,

    /// Delete files at or below the in-flight threshold.
    #[arg(long)]
    pub purge_undersized: bool,
}

impl OverrideArgs {
    pub fn apply(&self, config: &mut ConsolidatorConfig) -> Result<(), CliError> {
        if let Some(root) = &self.store_root {
            config.store.root = root.clone();
        }
        if let Some(base) = &self.base_path {
            config.store.base_path = base.clone();
        }
        if let Some(size) = &self.target_size {
            config.planner.target_output_size_bytes = parse_target_size(size)?;
        }
        if let Some(min) = self.min_files {
            config.planner.min_files = min;
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch.root = Some(dir.clone());
        }
        if let Some(size) = &self.in_flight_threshold {
            config.planner.in_flight_threshold_bytes = parse_byte_size(size)
                .map_err(|e| CliError::Argument(format!("--in-flight-threshold: {}", e)))?;
        }
        if self.purge_undersized {
            config.planner.purge_undersized = true;
        }
        Ok(())
    }
}

/// `--target-size` value: bare integers are MiB, anything else a byte size.
pub fn parse_target_size(raw: &str) -> Result<u64, CliError> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let mib: u64 = trimmed
            .parse()
            .map_err(|e| CliError::Argument(format!("--target-size: {}", e)))?;
        return mib
            .checked_mul(MIB)
            .ok_or_else(|| CliError::Argument(format!("--target-size: {} MiB is too large", mib)));
    }
    parse_byte_size(trimmed).map_err(|e| CliError::Argument(format!("--target-size: {}", e)))
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Input(#[from] pqc_common::Error),

    #[error("invalid argument {0}")]
    Argument(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to render output: {0}")]
    Render(String),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Render(_) => ExitCode::InternalError,
            _ => ExitCode::ConfigError,
        }
    }
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}

fn execute(cli: &Cli) -> Result<ExitCode, CliError> {
    match &cli.command {
        Commands::Consolidate(args) => {
            consolidate(cli, &args.partitions, &args.overrides, args.dry_run)
        }
        Commands::Analyze(args) => consolidate(cli, &args.partitions, &args.overrides, true),
        Commands::Config { action } => match action {
            ConfigCommand::Show(overrides) => show_config(cli, overrides),
            ConfigCommand::Validate { path } => validate_config(cli, path.as_ref()),
        },
    }
}

/// Resolve the config file, then apply overrides and re-validate.
fn effective_config(
    cli: &Cli,
    overrides: &OverrideArgs,
) -> Result<(ConsolidatorConfig, ConfigSource), CliError> {
    let resolved = resolve_config(&ConfigPaths::discover(cli.config.clone()))?;
    let mut config = resolved.config;
    overrides.apply(&mut config)?;
    validate(&config)?;
    debug!(source = %resolved.source, "effective configuration ready");
    Ok((config, resolved.source))
}

fn consolidate(
    cli: &Cli,
    partitions: &PartitionArgs,
    overrides: &OverrideArgs,
    dry_run: bool,
) -> Result<ExitCode, CliError> {
    let keys = partitions.resolve()?;
    let (config, _) = effective_config(cli, overrides)?;
    let store = ObjectStoreRemote::open(&config.store.root)?;

    let report = Consolidator::new(&store, config).run(&keys, dry_run);
    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| CliError::Render(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Summary => print!("{}", report.render_summary()),
    }
    Ok(report.exit_code())
}

fn show_config(cli: &Cli, overrides: &OverrideArgs) -> Result<ExitCode, CliError> {
    let (config, source) = effective_config(cli, overrides)?;
    match cli.format {
        OutputFormat::Json => {
            let doc = serde_json::json!({ "source": source, "config": config });
            let json =
                serde_json::to_string_pretty(&doc).map_err(|e| CliError::Render(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Summary => {
            let body =
                toml::to_string_pretty(&config).map_err(|e| CliError::Render(e.to_string()))?;
            println!("# source: {}", source);
            print!("{}", body);
        }
    }
    Ok(ExitCode::Success)
}

fn validate_config(cli: &Cli, path: Option<&PathBuf>) -> Result<ExitCode, CliError> {
    let source = match path {
        Some(path) => {
            validate(&load_file(path)?)?;
            ConfigSource::Explicit(path.clone())
        }
        None => resolve_config(&ConfigPaths::discover(cli.config.clone()))?.source,
    };
    match cli.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "valid": true, "source": source })
        ),
        OutputFormat::Summary => println!("configuration is valid ({})", source),
    }
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_size_bare_number_is_mib() {
        assert_eq!(parse_target_size("128").unwrap(), 128 * MIB);
        assert_eq!(parse_target_size("1GiB").unwrap(), 1024 * MIB);
        assert_eq!(parse_target_size("512k").unwrap(), 512 * 1024);
        assert!(parse_target_size("lots").is_err());
    }

    #[test]
    fn partitions_from_range_and_keys() {
        let args = PartitionArgs {
            date: Some("2025-08-15".into()),
            days_back: Some(2),
            partitions: vec!["2025-08-14".into(), "backfill".into()],
        };
        let keys: Vec<String> = args
            .resolve()
            .unwrap()
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["2025-08-15", "2025-08-14", "2025-08-13", "backfill"]);
    }

    #[test]
    fn no_partition_is_a_config_error() {
        let err = PartitionArgs::default().resolve().unwrap_err();
        assert_eq!(CliError::from(err).exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn overrides_apply() {
        let mut config = ConsolidatorConfig::default();
        let overrides = OverrideArgs {
            store_root: Some("/mnt/hdfs".into()),
            target_size: Some("64".into()),
            min_files: Some(3),
            in_flight_threshold: Some("4k".into()),
            purge_undersized: true,
            ..OverrideArgs::default()
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.store.root, "/mnt/hdfs");
        assert_eq!(config.planner.target_output_size_bytes, 64 * MIB);
        assert_eq!(config.planner.min_files, 3);
        assert_eq!(config.planner.in_flight_threshold_bytes, 4096);
        assert!(config.planner.purge_undersized);
    }

    #[test]
    fn unreachable_store_is_a_config_error() {
        let err = CliError::from(StoreError::open("s3://", "bucket missing"));
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from([
            "pqc",
            "consolidate",
            "--date",
            "2025-08-15",
            "--days-back",
            "3",
            "--dry-run",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Consolidate(args) => {
                assert!(args.dry_run);
                assert_eq!(args.partitions.days_back, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["pqc", "analyze", "--days-back", "3"]).is_err());
    }
}
