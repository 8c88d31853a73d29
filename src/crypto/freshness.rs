//! Request freshness enforcement (replay attack prevention).
//!
//! A signed timestamp is accepted only inside the open window
//! `(now - tolerance, now)`: strictly in the past, and strictly younger than
//! the tolerance.

use crate::TokenServerError;
use chrono::{DateTime, Duration, Utc};

/// Parse a wire timestamp (integer milliseconds since the Unix epoch).
pub fn parse_timestamp_millis(raw: &str) -> Result<DateTime<Utc>, TokenServerError> {
    let millis: i64 = raw
        .trim()
        .parse()
        .map_err(|e| TokenServerError::InvalidQuery(format!("Invalid timestamp: {} ({})", raw, e)))?;

    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| TokenServerError::InvalidQuery(format!("Timestamp out of range: {}", millis)))
}

/// Check that a request timestamp falls inside the freshness window.
///
/// # Errors
/// * `InvalidTimestamp` - timestamp is not in the past, or is at least
///   `tolerance` old
pub fn check_freshness(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), TokenServerError> {
    let age = now - timestamp;

    if age <= Duration::zero() || age >= tolerance {
        return Err(TokenServerError::InvalidTimestamp);
    }

    Ok(())
}
