//! # CLI Command Implementations
//!
//! Each subcommand of the `helm-values` command-line tool lives in its own
//! file, with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `helm_values` library.

pub mod aggregate;
pub mod completions;
