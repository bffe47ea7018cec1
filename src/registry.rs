// 🗂️ Account Registry - card issuance, uniqueness and authentication
//
// The store is the source of truth. The in-memory index is a cache of it,
// rebuilt on open, and is what uniqueness checks and logins consult.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::card_number::generate_candidate;
use crate::config::{BankConfig, IssuancePolicy};
use crate::db::Event;
use crate::entities::Card;
use crate::error::BankError;
use crate::pin::generate_pin;
use crate::store::CardStore;

/// Consecutive collisions tolerated before `create_card` gives up
pub const MAX_ISSUE_ATTEMPTS: u32 = 1_000;

const ACTOR: &str = "registry";

pub struct AccountRegistry<S, R> {
    store: S,
    rng: R,
    /// card number → card
    index: HashMap<String, Card>,
    next_id: i64,
    issuer_prefix: String,
    issuance: IssuancePolicy,
}

impl<S: CardStore, R: Rng> AccountRegistry<S, R> {
    /// Build the registry over `store`, rebuilding the index from it.
    ///
    /// The id counter resumes one past the highest persisted id, but never
    /// below `config.first_sequence_id`.
    pub fn open(store: S, rng: R, config: &BankConfig) -> Result<Self, BankError> {
        config.validate()?;

        let index: HashMap<String, Card> = store
            .load_cards()?
            .into_iter()
            .map(|card| (card.number.clone(), card))
            .collect();

        let next_id = match store.max_card_id()? {
            Some(max) => (max + 1).max(config.first_sequence_id),
            None => config.first_sequence_id,
        };

        info!(cards = index.len(), next_id, "Card index rebuilt from store");

        Ok(AccountRegistry {
            store,
            rng,
            index,
            next_id,
            issuer_prefix: config.issuer_prefix.clone(),
            issuance: config.issuance,
        })
    }

    /// Issue a new card with a unique number and a fresh PIN.
    ///
    /// Under `IssuancePolicy::Transactional` a storage failure aborts the
    /// issuance. Under `BestEffort` the card is still handed out and kept in
    /// the index for the rest of the session.
    pub fn create_card(&mut self) -> Result<Card, BankError> {
        let mut collisions = 0;

        loop {
            if collisions >= MAX_ISSUE_ATTEMPTS {
                return Err(BankError::NumberSpaceExhausted {
                    attempts: collisions,
                });
            }

            let number = generate_candidate(&mut self.rng, &self.issuer_prefix)?;
            if self.index.contains_key(&number) {
                collisions += 1;
                debug!(collisions, "Candidate number already issued, retrying");
                continue;
            }

            let pin = generate_pin(&mut self.rng);
            let card = Card::new(self.next_id, number, pin);

            match self.store.insert_card(&card) {
                Ok(()) => {}
                Err(BankError::DuplicateCard { number }) => {
                    // Someone else wrote to the store: refresh the cache and retry
                    collisions += 1;
                    debug!(collisions, "Store rejected card as duplicate, resyncing");
                    self.resync_after_conflict(number)?;
                    continue;
                }
                Err(err) => match self.issuance {
                    IssuancePolicy::Transactional => {
                        warn!(error = %err, "Card issuance aborted, store write failed");
                        return Err(err);
                    }
                    IssuancePolicy::BestEffort => {
                        warn!(
                            error = %err,
                            card = %card.masked_number(),
                            "Card issued but not persisted; it will be lost on exit"
                        );
                    }
                },
            }

            self.next_id += 1;
            self.index.insert(card.number.clone(), card.clone());

            info!(id = card.id, card = %card.masked_number(), "Card issued");
            self.record(Event::new(
                "card_created",
                "card",
                &card.number,
                serde_json::to_value(&card).unwrap_or_default(),
                ACTOR,
            ));

            return Ok(card);
        }
    }

    fn resync_after_conflict(&mut self, number: String) -> Result<(), BankError> {
        if let Some(existing) = self.store.find_card(&number)? {
            self.index.insert(number, existing);
        }
        if let Some(max) = self.store.max_card_id()? {
            self.next_id = self.next_id.max(max + 1);
        }
        Ok(())
    }

    /// Match a card number and PIN.
    ///
    /// Unknown numbers and wrong PINs fail with the same `AuthFailure`.
    pub fn authenticate(&self, number: &str, pin: &str) -> Result<Card, BankError> {
        match self.index.get(number) {
            Some(card) if card.pin_matches(pin) => {
                info!(card = %card.masked_number(), "Login succeeded");
                self.record(Event::new(
                    "login_succeeded",
                    "card",
                    &card.number,
                    serde_json::json!({}),
                    ACTOR,
                ));
                Ok(card.clone())
            }
            _ => {
                warn!("Login rejected");
                Err(BankError::AuthFailure)
            }
        }
    }

    /// Persisted balance of `card`
    pub fn get_balance(&self, card: &Card) -> Result<i64, BankError> {
        match self.store.find_card(&card.number)? {
            Some(stored) => Ok(stored.balance),
            None => Err(BankError::storage(format!(
                "card {} was never persisted",
                card.masked_number()
            ))),
        }
    }

    pub fn record_logout(&self, card: &Card) {
        self.record(Event::new(
            "logged_out",
            "card",
            &card.number,
            serde_json::json!({}),
            ACTOR,
        ));
    }

    /// Audit history of a card, newest first
    pub fn events_for_card(&self, number: &str) -> Result<Vec<Event>, BankError> {
        self.store.events_for_card(number)
    }

    // Audit writes never fail the operation that triggered them
    fn record(&self, event: Event) {
        if let Err(err) = self.store.record_event(&event) {
            warn!(error = %err, event_type = %event.event_type, "Failed to record audit event");
        }
    }

    pub fn find(&self, number: &str) -> Option<&Card> {
        self.index.get(number)
    }

    /// Number of cards in the index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Id the next issued card will receive
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
