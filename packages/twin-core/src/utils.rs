//! General utilities shared across the library.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;

use crate::error::TwinResult;
use crate::protocol_constants::HTTP_TIMEOUT_SECS;

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Adds a signed delta to a counter, clamping at zero.
#[must_use]
pub fn clamped_add(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

/// Builds the HTTP client shared by the command, health and scenario calls.
pub fn build_http_client() -> TwinResult<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_add_never_goes_negative() {
        assert_eq!(clamped_add(5, -3), 2);
        assert_eq!(clamped_add(5, -500), 0);
        assert_eq!(clamped_add(0, i64::MIN), 0);
        assert_eq!(clamped_add(5, 10), 15);
        assert_eq!(clamped_add(u64::MAX, 1), u64::MAX);
    }
}
