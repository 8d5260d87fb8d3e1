//! Mission epoch.
//!
//! On-board timestamps count seconds since 2000-01-01T00:00:00Z.

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time of the mission epoch.
pub const MISSION_EPOCH_UNIX: u64 = 946_684_800;

/// Convert mission seconds to Unix seconds.
#[inline]
pub fn to_unix(mission_seconds: u32) -> u64 {
    MISSION_EPOCH_UNIX + mission_seconds as u64
}

/// Convert Unix seconds to mission seconds.
///
/// Returns `None` before the epoch or past the range of a u32.
pub fn from_unix(unix_seconds: u64) -> Option<u32> {
    unix_seconds
        .checked_sub(MISSION_EPOCH_UNIX)
        .and_then(|s| u32::try_from(s).ok())
}

/// Current wall clock in mission seconds.
pub fn now() -> Option<u32> {
    let unix = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    from_unix(unix)
}
