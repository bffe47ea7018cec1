//! Runtime configuration for the bank.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::card_number::{validate_issuer_prefix, DEFAULT_ISSUER_PREFIX};
use crate::error::BankError;

/// What `create_card` does when the card cannot be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuancePolicy {
    /// Fail the issuance; nothing is indexed and the id is not consumed
    #[default]
    Transactional,
    /// Warn, keep the card for the rest of the session and hand it out anyway
    BestEffort,
}

/// Bank configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Skip SQLite and keep cards in memory only.
    #[serde(default)]
    pub in_memory: bool,
    /// First six digits of every issued card.
    #[serde(default = "default_issuer_prefix")]
    pub issuer_prefix: String,
    /// Lowest id handed out when the store is empty.
    #[serde(default = "default_first_sequence_id")]
    pub first_sequence_id: i64,
    #[serde(default)]
    pub issuance: IssuancePolicy,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("card.s3db")
}

fn default_issuer_prefix() -> String {
    DEFAULT_ISSUER_PREFIX.to_string()
}

fn default_first_sequence_id() -> i64 {
    101
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            db_path: default_db_path(),
            in_memory: false,
            issuer_prefix: default_issuer_prefix(),
            first_sequence_id: default_first_sequence_id(),
            issuance: IssuancePolicy::default(),
        }
    }
}

impl BankConfig {
    /// Reject values the registry cannot work with.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed issuer prefix or a negative first id.
    pub fn validate(&self) -> Result<(), BankError> {
        validate_issuer_prefix(&self.issuer_prefix)?;
        if self.first_sequence_id < 0 {
            return Err(BankError::invalid_input(format!(
                "first id must not be negative, got {}",
                self.first_sequence_id
            )));
        }
        Ok(())
    }
}
