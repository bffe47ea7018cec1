// 🔢 Luhn Checksum - check digit construction and validation

use crate::error::BankError;

/// Compute the Luhn check digit for a payload of decimal digits.
///
/// Positions are counted from 1 on the left; odd positions are doubled
/// (minus 9 when above 9). The returned digit brings the total to a multiple
/// of 10. With an odd-length payload, such as the 15 digits of a card number,
/// `payload + check digit` passes [`is_luhn_valid`].
pub fn compute_luhn_check_digit(digits: &str) -> Result<u8, BankError> {
    if digits.is_empty() {
        return Err(BankError::invalid_input("checksum input is empty"));
    }

    let mut total: u32 = 0;
    for (i, ch) in digits.chars().enumerate() {
        let value = ch
            .to_digit(10)
            .ok_or_else(|| BankError::invalid_input(format!("'{}' is not a decimal digit", ch)))?;

        let position = i + 1;
        total += if position % 2 == 1 {
            let doubled = value * 2;
            if doubled > 9 {
                doubled - 9
            } else {
                doubled
            }
        } else {
            value
        };
    }

    Ok(((10 - total % 10) % 10) as u8)
}

/// Standard mod-10 check over a complete number (rightmost digit is the check digit).
pub fn is_luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let value = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = value * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                value
            }
        })
        .sum();

    sum % 10 == 0
}
