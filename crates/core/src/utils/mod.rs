//! Small helpers shared by the services.

pub mod ids;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch according to the system clock.
pub fn epoch_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
