//! Error types for the card bank
//!
//! Every fallible operation in the library returns [`BankError`]. The variants
//! follow the three failure families the console has to tell apart:
//!
//! - **Input errors**: malformed menu selections, PINs or digit strings
//! - **Authentication errors**: card number / PIN mismatch
//! - **Storage errors**: anything the persistent store reports

use thiserror::Error;

/// Main error type for the card bank
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// Input that does not have the expected shape
    ///
    /// Recoverable: the console reports it and re-prompts.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Card number unknown or PIN mismatch
    ///
    /// Deliberately carries no detail so both cases read the same.
    #[error("Wrong card number or PIN!")]
    AuthFailure,

    /// The persistent store failed to connect, read or write
    #[error("Storage failure: {message}")]
    StorageFailure {
        /// Diagnostic from the underlying store
        message: String,
    },

    /// The store already holds a card with this number
    #[error("Card number {number} is already issued")]
    DuplicateCard {
        /// The colliding card number
        number: String,
    },

    /// Candidate generation kept colliding with issued numbers
    #[error("Could not find a free card number after {attempts} attempts")]
    NumberSpaceExhausted {
        /// Number of consecutive collisions
        attempts: u32,
    },

    /// Command not accepted in the current session state
    #[error("'{command}' is not available while {state}")]
    InvalidTransition {
        /// The rejected command
        command: &'static str,
        /// Human readable name of the current state
        state: &'static str,
    },
}

impl BankError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BankError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BankError::StorageFailure {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for BankError {
    fn from(err: anyhow::Error) -> Self {
        BankError::storage(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_input(BankError::invalid_input("menu option 'x'"), "Invalid input: menu option 'x'")]
    #[case::auth(BankError::AuthFailure, "Wrong card number or PIN!")]
    #[case::storage(BankError::storage("disk I/O error"), "Storage failure: disk I/O error")]
    #[case::duplicate(
        BankError::DuplicateCard { number: "4000000000000002".to_string() },
        "Card number 4000000000000002 is already issued"
    )]
    #[case::exhausted(
        BankError::NumberSpaceExhausted { attempts: 1000 },
        "Could not find a free card number after 1000 attempts"
    )]
    #[case::transition(
        BankError::InvalidTransition { command: "balance", state: "logged out" },
        "'balance' is not available while logged out"
    )]
    fn test_error_messages(#[case] error: BankError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_anyhow_maps_to_storage_failure() {
        let err = anyhow::anyhow!("no such table: card").context("Failed to read cards");
        let bank_err: BankError = err.into();

        assert_eq!(
            bank_err,
            BankError::storage("Failed to read cards: no such table: card")
        );
    }
}
