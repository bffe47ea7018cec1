// Entity Models
//
// A card is the bank's only entity: identity is the registry-assigned id,
// the number is unique, and nothing changes after issuance.

pub mod card;

pub use card::{mask_card_number, Card};
