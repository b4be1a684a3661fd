//! Clock helpers. The workspace convention is unix-millis `u64` timestamps
//! and `f64` seconds for durations.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Elapsed seconds between two unix-millis stamps, clamped to zero.
pub fn elapsed_secs(start_millis: u64, end_millis: u64) -> f64 {
    end_millis.saturating_sub(start_millis) as f64 / 1000.0
}
