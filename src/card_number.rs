// 💳 Card Number Generator - issuer prefix + random account segment + check digit

use rand::Rng;

use crate::error::BankError;
use crate::luhn::compute_luhn_check_digit;

/// Default issuer identification number
pub const DEFAULT_ISSUER_PREFIX: &str = "400000";

pub const ISSUER_PREFIX_LEN: usize = 6;
pub const ACCOUNT_SEGMENT_LEN: usize = 9;
pub const CARD_NUMBER_LEN: usize = ISSUER_PREFIX_LEN + ACCOUNT_SEGMENT_LEN + 1;

/// Check that a prefix is exactly six ASCII digits
pub fn validate_issuer_prefix(prefix: &str) -> Result<(), BankError> {
    if prefix.len() != ISSUER_PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BankError::invalid_input(format!(
            "issuer prefix must be {} digits, got '{}'",
            ISSUER_PREFIX_LEN, prefix
        )));
    }
    Ok(())
}

/// Draw a 9-digit account segment.
///
/// The raw draw can have 10 digits; the surplus digit is removed at a random
/// position rather than always from the front, so the leading digit is not
/// skewed towards zero. Short draws are zero-padded on the left.
pub fn generate_account_segment<R: Rng + ?Sized>(rng: &mut R) -> String {
    let raw: u32 = rng.gen_range(0..i32::MAX as u32);
    let mut segment = raw.to_string();

    while segment.len() > ACCOUNT_SEGMENT_LEN {
        let position = rng.gen_range(0..segment.len());
        segment.remove(position);
    }

    format!("{:0>width$}", segment, width = ACCOUNT_SEGMENT_LEN)
}

/// Build a 16-digit, Luhn-complete card number under `issuer_prefix`.
///
/// Uniqueness is not checked here; see `AccountRegistry::create_card`.
pub fn generate_candidate<R: Rng + ?Sized>(
    rng: &mut R,
    issuer_prefix: &str,
) -> Result<String, BankError> {
    validate_issuer_prefix(issuer_prefix)?;

    let mut number = String::with_capacity(CARD_NUMBER_LEN);
    number.push_str(issuer_prefix);
    number.push_str(&generate_account_segment(rng));

    let check_digit = compute_luhn_check_digit(&number)?;
    number.push(char::from(b'0' + check_digit));

    Ok(number)
}
