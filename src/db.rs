use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::entities::Card;

/// Event for the audit trail ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Idempotent schema setup: safe to run on every startup
pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Failed to enable WAL journal mode")?;

    // ==========================================================================
    // Card Table (one row per issued card, id assigned by the registry)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS card (
            id INTEGER PRIMARY KEY,
            number TEXT,
            pin TEXT,
            balance INTEGER DEFAULT 0
        )",
        [],
    )
    .context("Failed to create card table")?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create events table")?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_card_number ON card(number)",
        [],
    )
    .context("Failed to create card number index (duplicate card numbers in store?)")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert a card. Returns `false` when the id or number is already taken.
pub fn insert_card(conn: &Connection, card: &Card) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO card (id, number, pin, balance) VALUES (?1, ?2, ?3, ?4)",
        params![card.id, card.number, card.pin, card.balance],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e).context("Failed to save card"),
    }
}

fn card_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        number: row.get(1)?,
        pin: row.get(2)?,
        balance: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
    })
}

pub fn find_card_by_number(conn: &Connection, number: &str) -> Result<Option<Card>> {
    conn.query_row(
        "SELECT id, number, pin, balance FROM card WHERE number = ?1",
        params![number],
        card_from_row,
    )
    .optional()
    .context("Failed to look up card")
}

pub fn get_all_cards(conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare("SELECT id, number, pin, balance FROM card ORDER BY id")?;

    let cards = stmt
        .query_map([], card_from_row)?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read cards")?;

    Ok(cards)
}

/// Highest id in the card table, `None` when empty
pub fn max_card_id(conn: &Connection) -> Result<Option<i64>> {
    let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM card", [], |row| row.get(0))?;
    Ok(max)
}

pub fn count_cards(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM card", [], |row| row.get(0))?;

    Ok(count)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )
    .context("Failed to record event")?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read events")?;

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_card(id: i64, number: &str) -> Card {
        Card::new(id, number.to_string(), "1234".to_string())
    }

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = open_test_db();
        insert_card(&conn, &create_test_card(101, "4000000000000002")).unwrap();

        // Second run must neither fail nor wipe data
        setup_database(&conn).unwrap();

        assert_eq!(count_cards(&conn).unwrap(), 1);
    }

    #[test]
    fn test_insert_and_find_card() {
        let conn = open_test_db();
        let card = create_test_card(101, "4000000000000002");

        assert!(insert_card(&conn, &card).unwrap());

        let found = find_card_by_number(&conn, "4000000000000002").unwrap();
        assert_eq!(found, Some(card));
        assert_eq!(find_card_by_number(&conn, "4000000000000010").unwrap(), None);
    }

    #[test]
    fn test_duplicate_number_is_rejected() {
        let conn = open_test_db();

        assert!(insert_card(&conn, &create_test_card(101, "4000000000000002")).unwrap());
        assert!(!insert_card(&conn, &create_test_card(102, "4000000000000002")).unwrap());

        assert_eq!(count_cards(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let conn = open_test_db();

        assert!(insert_card(&conn, &create_test_card(101, "4000000000000002")).unwrap());
        assert!(!insert_card(&conn, &create_test_card(101, "4000000000000010")).unwrap());
    }

    #[test]
    fn test_number_is_bound_as_parameter() {
        let conn = open_test_db();
        let hostile = "1'); DROP TABLE card; --";

        assert!(insert_card(&conn, &create_test_card(101, hostile)).unwrap());

        let found = find_card_by_number(&conn, hostile).unwrap().unwrap();
        assert_eq!(found.number, hostile);
        assert_eq!(count_cards(&conn).unwrap(), 1);
    }

    #[test]
    fn test_max_card_id_and_listing() {
        let conn = open_test_db();
        assert_eq!(max_card_id(&conn).unwrap(), None);

        insert_card(&conn, &create_test_card(105, "4000000000000010")).unwrap();
        insert_card(&conn, &create_test_card(101, "4000000000000002")).unwrap();

        assert_eq!(max_card_id(&conn).unwrap(), Some(105));

        let ids: Vec<i64> = get_all_cards(&conn).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![101, 105]);
    }

    #[test]
    fn test_null_balance_reads_as_zero() {
        let conn = open_test_db();
        conn.execute(
            "INSERT INTO card (id, number, pin, balance) VALUES (1, '4000000000000002', '0000', NULL)",
            [],
        )
        .unwrap();

        let card = find_card_by_number(&conn, "4000000000000002").unwrap().unwrap();
        assert_eq!(card.balance, 0);
    }

    #[test]
    fn test_event_log() {
        let conn = open_test_db();

        let event = Event::new(
            "card_created",
            "card",
            "4000000000000002",
            serde_json::json!({"id": 101}),
            "registry",
        );

        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "card", "4000000000000002").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "card_created");
        assert_eq!(events[0].actor, "registry");
        assert_eq!(events[0].data["id"], 101);
        assert!(get_events_for_entity(&conn, "card", "other").unwrap().is_empty());
    }
}
