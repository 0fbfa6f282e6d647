//! Virtual-card material synthesis.

use chrono::{DateTime, Months, Utc};
use common::protocol::CardDetails;
use rand::Rng;

/// Number of digits in a synthesized card number.
pub const CARD_NUMBER_LEN: usize = 16;

/// Card validity period.
pub const VALIDITY: Months = Months::new(36);

/// Generate a fresh card number, CVV and expiry relative to `now`.
pub fn synthesize(now: DateTime<Utc>) -> CardDetails {
    let mut rng = rand::thread_rng();
    let card_number = (0..CARD_NUMBER_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    let cvv = rng.gen_range(100..=999u16).to_string();

    CardDetails {
        card_number,
        cvv,
        expiry_date: expiry_date(now),
    }
}

/// `MM/YY` for the month [`VALIDITY`] after `now`.
///
/// Day-of-month overflow clamps to the end of the month (29 Feb → 28 Feb), so
/// the month is always the creation month.
pub fn expiry_date(now: DateTime<Utc>) -> String {
    (now.date_naive() + VALIDITY).format("%m/%y").to_string()
}
