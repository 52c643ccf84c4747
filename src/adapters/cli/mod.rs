//! CLI Adapter
//!
//! Command-line interface for dexwatch.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{AddCmd, Cli, Command, PricesCmd, ResetCmd, RunCmd, StatusCmd, TrackCmd};

/// Parse process arguments
pub fn init() -> Cli {
    use clap::Parser;
    Cli::parse()
}
