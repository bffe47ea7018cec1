// CLI module
// Command-line arguments for the card bank binary

use clap::Parser;
use std::path::PathBuf;

use crate::card_number::DEFAULT_ISSUER_PREFIX;
use crate::config::{BankConfig, IssuancePolicy};
use crate::error::BankError;

/// Simulated bank: issue cards, log in, check balances
#[derive(Parser, Debug)]
#[command(name = "card-bank")]
#[command(about = "Simulated bank: issue cards, log in, check balances", long_about = None)]
pub struct CliArgs {
    /// SQLite database file holding issued cards
    #[arg(
        long = "fileName",
        visible_alias = "db",
        env = "CARD_BANK_DB",
        value_name = "PATH",
        default_value = "card.s3db"
    )]
    pub db_path: PathBuf,

    /// First six digits of every issued card number
    #[arg(
        long = "issuer-prefix",
        env = "CARD_BANK_ISSUER",
        value_name = "DIGITS",
        default_value = DEFAULT_ISSUER_PREFIX
    )]
    pub issuer_prefix: String,

    /// Id of the first card when the database is empty
    #[arg(long = "first-id", env = "CARD_BANK_FIRST_ID", value_name = "N", default_value_t = 101)]
    pub first_id: i64,

    /// Hand out cards even when saving them fails
    #[arg(long = "best-effort-persist")]
    pub best_effort_persist: bool,

    /// Keep cards in memory only; nothing is written to disk
    #[arg(long = "in-memory", conflicts_with = "db_path")]
    pub in_memory: bool,
}

impl CliArgs {
    /// Build a validated [`BankConfig`] from the arguments
    pub fn to_config(&self) -> Result<BankConfig, BankError> {
        let config = BankConfig {
            db_path: self.db_path.clone(),
            in_memory: self.in_memory,
            issuer_prefix: self.issuer_prefix.clone(),
            first_sequence_id: self.first_id,
            issuance: if self.best_effort_persist {
                IssuancePolicy::BestEffort
            } else {
                IssuancePolicy::Transactional
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse command-line arguments; clap exits on `--help` or bad arguments
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
