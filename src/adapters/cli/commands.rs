//! CLI Commands
//!
//! Argument definitions for every dexwatch subcommand.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CONFIG_PATH;

/// dexwatch - DEX token milestone tracker
#[derive(Parser, Debug)]
#[command(
    name = "dexwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Tracks newly discovered DEX tokens and alerts on price milestones",
    long_about = "dexwatch records a baseline price for every discovered token, re-prices \
                  the tracked set on a schedule through DexScreener and alerts once per \
                  milestone (+50%, 2x, 5x, 10x, -50%) per token."
)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the scheduled tracking loop
    Run(RunCmd),

    /// Run a single tracking cycle and print its milestones
    Track(TrackCmd),

    /// Show tracked token count and the most recent tokens
    Status(StatusCmd),

    /// Register a discovered token with its baseline price
    Add(AddCmd),

    /// Look up current prices without touching the store
    Prices(PricesCmd),

    /// Delete every tracked token
    Reset(ResetCmd),
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Run(cmd) => &cmd.config,
            Command::Track(cmd) => &cmd.config,
            Command::Status(cmd) => &cmd.config,
            Command::Add(cmd) => &cmd.config,
            Command::Prices(cmd) => &cmd.config,
            Command::Reset(cmd) => &cmd.config,
        }
    }
}

/// Start tracking loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Run one cycle and exit
    #[arg(long)]
    pub once: bool,
}

/// Single cycle
#[derive(Parser, Debug)]
pub struct TrackCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Store status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Number of recent tokens to list
    #[arg(short, long, value_name = "N", default_value = "20")]
    pub limit: usize,
}

/// Manual discovery insert
#[derive(Parser, Debug)]
pub struct AddCmd {
    /// Token contract address
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Chain identifier (e.g., solana, base)
    #[arg(long, value_name = "CHAIN")]
    pub chain: String,

    #[arg(long, value_name = "SYMBOL")]
    pub symbol: String,

    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Baseline USD price; 0 registers the token without tracking it
    #[arg(long, value_name = "USD")]
    pub price: f64,

    /// Liquidity in USD at discovery
    #[arg(long, value_name = "USD", default_value = "0")]
    pub liquidity: f64,

    /// Market cap in USD at discovery
    #[arg(long, value_name = "USD", default_value = "0")]
    pub market_cap: f64,
}

/// Price lookup
#[derive(Parser, Debug)]
pub struct PricesCmd {
    /// Token addresses
    #[arg(value_name = "ADDRESS", required = true)]
    pub addresses: Vec<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Wipe the store
#[derive(Parser, Debug)]
pub struct ResetCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Confirm deletion without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["dexwatch", "run"]).unwrap();
        match cli.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("config/dexwatch.toml"));
                assert!(!cmd.once);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_add_parses_market_fields() {
        let cli = Cli::try_parse_from([
            "dexwatch", "--debug", "add", "So1abc", "--chain", "solana", "--symbol", "WIF",
            "--name", "dogwifhat", "--price", "0.002", "--liquidity", "45000",
        ])
        .unwrap();

        assert!(cli.debug);
        let Command::Add(cmd) = cli.command else { panic!("expected add") };
        assert_eq!(cmd.address, "So1abc");
        assert_eq!(cmd.price, 0.002);
        assert_eq!(cmd.liquidity, 45000.0);
        assert_eq!(cmd.market_cap, 0.0);
    }

    #[test]
    fn test_prices_requires_address() {
        assert!(Cli::try_parse_from(["dexwatch", "prices"]).is_err());

        let cli = Cli::try_parse_from(["dexwatch", "prices", "a", "b", "-c", "x.toml"]).unwrap();
        assert_eq!(cli.command.config_path(), Path::new("x.toml"));
    }

    #[test]
    fn test_reset_flag() {
        let cli = Cli::try_parse_from(["dexwatch", "reset", "-y"]).unwrap();
        assert!(matches!(cli.command, Command::Reset(ResetCmd { yes: true, .. })));
    }
}
