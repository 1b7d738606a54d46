//! # metannot
//!
//! Command-line front end for the annotation pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Join library hits onto the feature table by ID
//! metannot merge features.csv gnps.tsv -o merged.csv --append compoundName,mqScore
//!
//! # Join in-silico predictions by rounded m/z
//! metannot merge merged.csv sirius.csv -o merged.csv --tolerance MZ=ionMass
//!
//! # Arbitrate, dereplicate and filter
//! metannot resolve merged.csv -o resolved.csv
//! metannot derep resolved.csv -o derep.csv
//! metannot filter derep.csv -o final.csv --list contaminants.txt
//!
//! # Or all at once from a config file
//! metannot --config metannot.toml run features.csv -o final.csv
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{dispatch, init_logging, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());
    dispatch(cli)
}
