//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Helm Values - Aggregate the JSON schemas of a chart and its dependencies
#[derive(Parser, Debug)]
#[command(name = "helm-values")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate the values schema of a chart with the schemas of its dependencies
    Aggregate(commands::aggregate::AggregateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Aggregate(args) => commands::aggregate::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        // Ignore the error of a logger already installed by an embedding process
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .try_init();
    }
}
