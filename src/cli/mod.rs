//! Command-line interface definitions.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// An automated trend-following trading agent for Polymarket binary markets.
#[derive(Parser, Debug)]
#[command(name = "hunter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    /// Detect opportunities but don't execute trades
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trading agent (foreground, interactive).
    Run,
    /// Validate configuration and exchange connectivity without trading.
    Check,
    /// Print recent trade activity and per-outcome P&L.
    Stats(StatsArgs),
    /// Wallet utilities.
    Wallet(WalletArgs),
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Look back this many hours.
    #[arg(long, default_value = "24")]
    pub hours: i64,
}

#[derive(Parser, Debug)]
pub struct WalletArgs {
    #[command(subcommand)]
    pub command: WalletCommands,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommands {
    /// Print the configured wallet address.
    Address,
    /// Print the on-chain collateral balance.
    Balance,
}
