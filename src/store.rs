//! Persistence boundary for issued cards
//!
//! The registry only talks to a [`CardStore`]. Two implementations exist:
//!
//! - [`SqliteStore`]: the durable store. Each operation opens its own
//!   connection and drops it before returning, on success and on error.
//! - [`MemoryStore`]: volatile, for tests and `--in-memory` sessions.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::db::{self, Event};
use crate::entities::Card;
use crate::error::BankError;

/// Key/value style persistence used by the registry
pub trait CardStore {
    /// Persist a new card. `DuplicateCard` if the number or id is taken.
    fn insert_card(&self, card: &Card) -> Result<(), BankError>;

    /// Look up a card by its full number
    fn find_card(&self, number: &str) -> Result<Option<Card>, BankError>;

    /// Every persisted card, ordered by id
    fn load_cards(&self) -> Result<Vec<Card>, BankError>;

    /// Highest persisted id, `None` for an empty store
    fn max_card_id(&self) -> Result<Option<i64>, BankError>;

    /// Append an audit event
    fn record_event(&self, event: &Event) -> Result<(), BankError>;

    /// Audit events for one card, newest first
    fn events_for_card(&self, number: &str) -> Result<Vec<Event>, BankError>;
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file and run the schema setup.
    ///
    /// This is the only store error treated as fatal by the binary.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let store = SqliteStore {
            path: path.as_ref().to_path_buf(),
        };
        store.with_connection(db::setup_database)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on a fresh connection; the connection is closed when this returns
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> Result<T, BankError> {
        let conn = Connection::open(&self.path).map_err(|e| {
            BankError::storage(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), "Opened store connection");

        let result = f(&conn).map_err(BankError::from);
        let closed = conn.close().map_err(|(_, e)| e);
        settle_close(result, closed)
    }
}

/// The operation's own result stands; a failed close is only logged
fn settle_close<T>(
    result: Result<T, BankError>,
    closed: rusqlite::Result<()>,
) -> Result<T, BankError> {
    if let Err(e) = closed {
        warn!(error = %e, "Failed to close store connection");
    }
    result
}

impl CardStore for SqliteStore {
    fn insert_card(&self, card: &Card) -> Result<(), BankError> {
        let inserted = self.with_connection(|conn| db::insert_card(conn, card))?;
        if inserted {
            Ok(())
        } else {
            Err(BankError::DuplicateCard {
                number: card.number.clone(),
            })
        }
    }

    fn find_card(&self, number: &str) -> Result<Option<Card>, BankError> {
        self.with_connection(|conn| db::find_card_by_number(conn, number))
    }

    fn load_cards(&self) -> Result<Vec<Card>, BankError> {
        self.with_connection(db::get_all_cards)
    }

    fn max_card_id(&self) -> Result<Option<i64>, BankError> {
        self.with_connection(db::max_card_id)
    }

    fn record_event(&self, event: &Event) -> Result<(), BankError> {
        self.with_connection(|conn| db::insert_event(conn, event))
    }

    fn events_for_card(&self, number: &str) -> Result<Vec<Event>, BankError> {
        self.with_connection(|conn| db::get_events_for_entity(conn, "card", number))
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Volatile store; nothing survives the process
#[derive(Default)]
pub struct MemoryStore {
    cards: RefCell<MemoryTables>,
    events: RefCell<Vec<Event>>,
}

#[derive(Default)]
struct MemoryTables {
    by_id: BTreeMap<i64, Card>,
    /// number → id, stands in for the unique index
    by_number: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.borrow().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CardStore for MemoryStore {
    fn insert_card(&self, card: &Card) -> Result<(), BankError> {
        let mut tables = self.cards.borrow_mut();
        if tables.by_id.contains_key(&card.id) || tables.by_number.contains_key(&card.number) {
            return Err(BankError::DuplicateCard {
                number: card.number.clone(),
            });
        }
        tables.by_number.insert(card.number.clone(), card.id);
        tables.by_id.insert(card.id, card.clone());
        Ok(())
    }

    fn find_card(&self, number: &str) -> Result<Option<Card>, BankError> {
        let tables = self.cards.borrow();
        Ok(tables
            .by_number
            .get(number)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    fn load_cards(&self) -> Result<Vec<Card>, BankError> {
        Ok(self.cards.borrow().by_id.values().cloned().collect())
    }

    fn max_card_id(&self) -> Result<Option<i64>, BankError> {
        Ok(self.cards.borrow().by_id.keys().next_back().copied())
    }

    fn record_event(&self, event: &Event) -> Result<(), BankError> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }

    fn events_for_card(&self, number: &str) -> Result<Vec<Event>, BankError> {
        Ok(self
            .events
            .borrow()
            .iter()
            .rev()
            .filter(|e| e.entity_type == "card" && e.entity_id == number)
            .cloned()
            .collect())
    }
}
