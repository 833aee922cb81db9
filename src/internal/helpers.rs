//! Internal helper functions.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Decode a hex identifier, ignoring spaces and case.
pub(crate) fn decode_hex_id(s: &str) -> Result<Vec<u8>> {
    let normalized: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&normalized).map_err(|e| Error::InvalidInput(format!("{}: {}", s, e)))
}

/// The Unix epoch, used as "no signature seen yet".
pub(crate) fn timestamp_zero() -> DateTime<Utc> {
    DateTime::from(std::time::UNIX_EPOCH)
}

/// Convert a SystemTime to chrono DateTime.
#[cfg(feature = "rpgp")]
pub(crate) fn system_time_to_datetime(st: std::time::SystemTime) -> DateTime<Utc> {
    DateTime::from(st)
}

/// Case-insensitive email comparison.
pub(crate) fn email_matches(a: &str, b: &str) -> bool {
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}
