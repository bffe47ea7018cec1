// 💳 Card Entity - the only account record the bank keeps
//
// A card is created once by the registry and never changes afterwards:
// - id: sequence number assigned by the registry (storage row key)
// - number: 16 digits, issuer prefix + account segment + Luhn check digit
// - pin: 4 digits, stored as issued
// - balance: starts at zero

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Sequence id, never reused within a process
    pub id: i64,

    /// Full card number (e.g. "4000001234567893")
    pub number: String,

    /// Plain-text PIN
    #[serde(skip_serializing)]
    pub pin: String,

    pub balance: i64,
}

impl Card {
    /// New card with a zero balance
    pub fn new(id: i64, number: String, pin: String) -> Self {
        Card {
            id,
            number,
            pin,
            balance: 0,
        }
    }

    /// Exact PIN comparison
    pub fn pin_matches(&self, pin: &str) -> bool {
        self.pin == pin
    }

    /// Card number with everything but the last 4 digits hidden
    ///
    /// Example: "4000001234567893" → "*7893"
    pub fn masked_number(&self) -> String {
        mask_card_number(&self.number)
    }
}

/// Mask a card number (show only last 4 digits)
pub fn mask_card_number(full_number: &str) -> String {
    if full_number.len() <= 4 {
        return full_number.to_string();
    }
    let last4 = &full_number[full_number.len() - 4..];
    format!("*{}", last4)
}
