//! # Helm Values CLI
//!
//! This is the binary entry point for the `helm-values` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging from the `--log-level` flag.
//! - Executing the appropriate command based on the parsed arguments.
//!
//! The aggregation itself lives in the `helm_values` library crate; the
//! binary only wires disk locations and flags into it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
