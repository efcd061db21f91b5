//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Modes
//!
//! - `--discover` - print the catalog built from the stream definitions
//! - default - sync the selected streams of the catalog, writing SCHEMA,
//!   RECORD and STATE messages to stdout

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
