// 🔑 PIN Generator

use rand::Rng;

pub const PIN_LEN: usize = 4;

/// Uniform PIN in 0000..=9999, zero-padded to four digits
pub fn generate_pin<R: Rng + ?Sized>(rng: &mut R) -> String {
    let pin: u16 = rng.gen_range(0..=9999);
    format!("{:04}", pin)
}

/// A PIN as typed by the cardholder: exactly four ASCII digits
pub fn is_well_formed_pin(pin: &str) -> bool {
    pin.len() == PIN_LEN && pin.bytes().all(|b| b.is_ascii_digit())
}
