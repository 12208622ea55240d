//! CLI argument definitions for the registry exporter.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use bpc_cli::logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "bpc-export",
    version,
    about = "Export GENIE BPC registry data as cBioPortal files",
    long_about = "Export curated GENIE BPC registry data for one sponsored-project cohort\n\
                  as cBioPortal clinical and timeline files.\n\n\
                  Every file is written atomically together with a provenance record\n\
                  listing the assets it was derived from."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export every category of one cohort for a release.
    Run(RunArgs),

    /// List configured cohorts and their skip/exclude rules.
    Cohorts(CohortsArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Cohort id, e.g. NSCLC.
    #[arg(value_name = "COHORT")]
    pub cohort: String,

    /// Release label, e.g. 1.1-consortium.
    #[arg(value_name = "RELEASE")]
    pub release: String,

    /// Asset directory containing manifest.toml (default: $BPC_ASSETS_DIR).
    #[arg(long = "assets", value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Cohort configuration file (default: $BPC_EXPORT_CONFIG or config/cohorts.toml).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory; files land in <DIR>/<COHORT>/.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Map through the generic data dictionary instead of the reference set.
    #[arg(long = "use-data-dictionary")]
    pub use_data_dictionary: bool,

    /// Extract and transform without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct CohortsArgs {
    /// Cohort configuration file (default: $BPC_EXPORT_CONFIG or config/cohorts.toml).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
