// Card Bank - Core Library
// Exposes all modules for use in the CLI and tests

pub mod card_number;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod luhn;
pub mod pin;
pub mod registry;
pub mod session;
pub mod store;
pub mod ui;

// Re-export commonly used types
pub use card_number::{generate_candidate, DEFAULT_ISSUER_PREFIX};
pub use config::{BankConfig, IssuancePolicy};
pub use db::{
    Event,
    setup_database, insert_card, find_card_by_number, get_all_cards,
    max_card_id, count_cards, insert_event, get_events_for_entity,
};
pub use entities::Card;
pub use error::BankError;
pub use luhn::{compute_luhn_check_digit, is_luhn_valid};
pub use pin::generate_pin;
pub use registry::AccountRegistry;
pub use session::{Command, Outcome, Session, SessionState};
pub use store::{CardStore, MemoryStore, SqliteStore};
pub use ui::Console;
