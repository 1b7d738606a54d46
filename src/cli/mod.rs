use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use metannot::derep::InsufficientQcPolicy;
use metannot::io::{read_table, write_csv};
use metannot::merge::DuplicateKeyPolicy;
use metannot::report::RunReport;
use metannot::table::Table;

mod config;
mod derep;
mod filter;
mod inspect;
mod merge;
mod resolve;
mod run;

pub use config::Config;

/// metannot - Metabolomics feature annotation and dereplication
#[derive(Parser)]
#[command(name = "metannot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Duplicate incoming key handling.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DuplicateArg {
    /// Keep the first incoming row per key
    FirstWins,
    /// Later incoming rows overwrite earlier ones
    LastWins,
}

impl From<DuplicateArg> for DuplicateKeyPolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::FirstWins => DuplicateKeyPolicy::FirstWins,
            DuplicateArg::LastWins => DuplicateKeyPolicy::LastWins,
        }
    }
}

/// Handling of rows with too few QC values.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum QcPolicyArg {
    /// Treat as perfectly stable
    Favorable,
    /// Exclude as unstable QC
    Exclude,
}

impl From<QcPolicyArg> for InsufficientQcPolicy {
    fn from(arg: QcPolicyArg) -> Self {
        match arg {
            QcPolicyArg::Favorable => InsufficientQcPolicy::Favorable,
            QcPolicyArg::Exclude => InsufficientQcPolicy::Exclude,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Join columns from an annotation table onto a feature table
    Merge {
        /// Base feature table (.csv, .tsv, .json)
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Incoming annotation table
        #[arg(value_name = "INCOMING")]
        incoming: PathBuf,

        /// Output CSV path
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Exact-join key column (default: ID)
        #[arg(short, long, conflicts_with = "tolerance")]
        key: Option<String>,

        /// Tolerance join as BASE_COLUMN=INCOMING_COLUMN, e.g. MZ=ionMass
        #[arg(short, long, value_name = "BASE=INCOMING")]
        tolerance: Option<String>,

        /// Columns to copy (comma-separated; default: every non-key column)
        #[arg(short, long, value_delimiter = ',')]
        append: Vec<String>,

        /// Decimals kept by tolerance joins
        #[arg(short, long)]
        precision: Option<u32>,

        /// Which incoming row wins on duplicate keys
        #[arg(long, value_enum)]
        duplicates: Option<DuplicateArg>,
    },

    /// Arbitrate library and in-silico identifications into one annotation
    Resolve {
        /// Merged feature table
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output CSV path
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Column receiving the resolved annotation
        #[arg(long)]
        column: Option<String>,

        /// Also write the rule that fired per row
        #[arg(long)]
        explain: bool,
    },

    /// Keep one feature per annotation based on replicate quality
    Derep {
        /// Annotated feature table
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output CSV path
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Maximum biological missing rate in percent
        #[arg(long)]
        max_missing: Option<f64>,

        /// Maximum QC RSD in percent
        #[arg(long)]
        max_rsd: Option<f64>,

        /// RSD window around the most stable candidate
        #[arg(long)]
        rsd_window: Option<f64>,

        /// QC column prefix
        #[arg(long)]
        qc_prefix: Option<String>,

        /// Biological column prefixes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        bio_prefix: Vec<String>,

        /// Handling of rows with fewer than two QC values
        #[arg(long, value_enum)]
        insufficient_qc: Option<QcPolicyArg>,

        /// Export only rows marked Retained
        #[arg(long)]
        retained_only: bool,

        /// Columns to leave out of the export (comma-separated)
        #[arg(long, value_delimiter = ',')]
        drop: Vec<String>,
    },

    /// Remove rows whose annotation is on a contaminant list
    Filter {
        /// Annotated feature table
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output CSV path
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Names to exclude (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        names: Vec<String>,

        /// Newline-separated list of names to exclude
        #[arg(short, long, value_name = "FILE")]
        list: Option<PathBuf>,

        /// Annotation column to match against
        #[arg(long)]
        column: Option<String>,
    },

    /// Run import, merge, resolve, dereplicate and filter in one go
    Run {
        /// Base feature table
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Output CSV path
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Extra ID-joined source as NAME=PATH (repeatable)
        #[arg(short, long = "source", value_name = "NAME=PATH")]
        sources: Vec<String>,

        /// Skip the resolve stage
        #[arg(long)]
        no_resolve: bool,

        /// Skip the dereplication stage
        #[arg(long)]
        no_derep: bool,

        /// Write the processing history as JSON
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,

        /// Columns to leave out of the export (comma-separated)
        #[arg(long, value_delimiter = ',')]
        drop: Vec<String>,
    },

    /// Summarize a feature table
    Inspect {
        /// Table to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Merge {
            base,
            incoming,
            output,
            key,
            tolerance,
            append,
            precision,
            duplicates,
        } => merge::run(
            &config,
            merge::MergeArgs {
                base,
                incoming,
                output,
                key,
                tolerance,
                append,
                precision,
                duplicates: duplicates.map(DuplicateKeyPolicy::from),
            },
        ),
        Commands::Resolve {
            input,
            output,
            column,
            explain,
        } => resolve::run(&config, input, output, column, explain),
        Commands::Derep {
            input,
            output,
            max_missing,
            max_rsd,
            rsd_window,
            qc_prefix,
            bio_prefix,
            insufficient_qc,
            retained_only,
            drop,
        } => derep::run(
            &config,
            derep::DerepArgs {
                input,
                output,
                max_missing,
                max_rsd,
                rsd_window,
                qc_prefix,
                bio_prefix,
                insufficient_qc: insufficient_qc.map(InsufficientQcPolicy::from),
                retained_only,
                drop,
            },
        ),
        Commands::Filter {
            input,
            output,
            names,
            list,
            column,
        } => filter::run(&config, input, output, names, list, column),
        Commands::Run {
            base,
            output,
            sources,
            no_resolve,
            no_derep,
            history,
            drop,
        } => run::run(
            &config,
            run::RunArgs {
                base,
                output,
                sources,
                resolve: !no_resolve,
                dereplicate: !no_derep,
                history,
                drop,
            },
        ),
        Commands::Inspect { file, json } => inspect::run(&config, file, json),
    }
}

/// Read a table, naming the file on failure.
fn load_table(path: &Path) -> Result<Table> {
    read_table(path).with_context(|| format!("Failed to read table: {}", path.display()))
}

/// Export a table as CSV without the `drop` columns.
fn save_table(table: &Table, path: &Path, drop: &[String]) -> Result<()> {
    let strip: Vec<&str> = drop.iter().map(String::as_str).collect();
    write_csv(table, path, &strip).with_context(|| format!("Failed to write table: {}", path.display()))?;
    println!("Wrote {} row(s) to {}", table.len(), path.display());
    Ok(())
}

/// Print a run report, colorized when available.
fn print_report(report: &RunReport) {
    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }
}
