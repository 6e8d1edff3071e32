//! Windows FILETIME decoding.
//!
//! FILETIME is a 64-bit count of 100ns ticks since 1601-01-01. All
//! conversions use 64-bit integer arithmetic only; the subtraction is
//! never done in floating point. Values decoding outside the
//! [2000-01-01, 2100-01-01) sanity window are treated as malformed
//! rather than propagated as nonsensical dates.

use chrono::{TimeZone, Utc};

use crate::constants::{
    FILETIME_UNIX_EPOCH_TICKS, TIMESTAMP_SANITY_MAX_MS, TIMESTAMP_SANITY_MIN_MS,
};

/// Decode a raw FILETIME tick count into Unix milliseconds.
///
/// Returns `None` for zero, for values before 1970, and for anything
/// outside the sanity window.
pub fn filetime_to_unix_ms(ticks: u64) -> Option<i64> {
    let ticks = i64::try_from(ticks).ok()?;
    let unix_ticks = ticks.checked_sub(FILETIME_UNIX_EPOCH_TICKS)?;
    let ms = unix_ticks / 10_000;
    in_sanity_window(ms).then_some(ms)
}

/// Decode 8 little-endian bytes (a REG_BINARY FILETIME blob) into Unix
/// milliseconds.
pub fn filetime_bytes_to_unix_ms(bytes: &[u8]) -> Option<i64> {
    let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    filetime_to_unix_ms(u64::from_le_bytes(raw))
}

/// Inverse conversion, used by round-trip tests.
pub fn unix_ms_to_filetime(ms: i64) -> u64 {
    (ms * 10_000 + FILETIME_UNIX_EPOCH_TICKS) as u64
}

/// True when `ms` falls inside [2000-01-01, 2100-01-01).
pub fn in_sanity_window(ms: i64) -> bool {
    (TIMESTAMP_SANITY_MIN_MS..TIMESTAMP_SANITY_MAX_MS).contains(&ms)
}

/// Render Unix milliseconds as a UTC timestamp for display.
pub fn format_unix_ms(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "unknown".to_string(),
    }
}

/// Unix milliseconds for "now", for recency-window comparisons.
pub fn now_unix_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_value() {
        // 2021-01-01 00:00:00 UTC = 1609459200000 ms
        let ticks = unix_ms_to_filetime(1_609_459_200_000);
        assert_eq!(filetime_to_unix_ms(ticks), Some(1_609_459_200_000));
    }

    #[test]
    fn test_zero_is_invalid() {
        assert_eq!(filetime_to_unix_ms(0), None);
    }

    #[test]
    fn test_pre_2000_is_invalid() {
        // 1999-12-31 decodes inside the FILETIME range but outside the window
        let ticks = unix_ms_to_filetime(946_598_400_000); // 1999-12-31
        assert_eq!(filetime_to_unix_ms(ticks), None);
    }

    #[test]
    fn test_post_2100_is_invalid() {
        let ticks = unix_ms_to_filetime(TIMESTAMP_SANITY_MAX_MS);
        assert_eq!(filetime_to_unix_ms(ticks), None);
    }

    #[test]
    fn test_bytes_little_endian() {
        let ticks = unix_ms_to_filetime(1_700_000_000_000);
        let bytes = ticks.to_le_bytes();
        assert_eq!(filetime_bytes_to_unix_ms(&bytes), Some(1_700_000_000_000));
    }

    #[test]
    fn test_short_byte_slice_is_invalid() {
        assert_eq!(filetime_bytes_to_unix_ms(&[1, 2, 3]), None);
    }

    #[test]
    fn test_extra_bytes_are_ignored() {
        // BAM values append flag bytes after the FILETIME
        let ticks = unix_ms_to_filetime(1_700_000_000_000);
        let mut bytes = ticks.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(filetime_bytes_to_unix_ms(&bytes), Some(1_700_000_000_000));
    }

    #[test]
    fn test_format_unix_ms() {
        assert_eq!(format_unix_ms(1_609_459_200_000), "2021-01-01 00:00:00 UTC");
    }

    proptest! {
        #[test]
        fn prop_round_trip_inside_window(
            ms in TIMESTAMP_SANITY_MIN_MS..TIMESTAMP_SANITY_MAX_MS
        ) {
            let ticks = unix_ms_to_filetime(ms);
            prop_assert_eq!(filetime_to_unix_ms(ticks), Some(ms));
        }

        #[test]
        fn prop_outside_window_never_decodes(raw in any::<u64>()) {
            if let Some(ms) = filetime_to_unix_ms(raw) {
                prop_assert!(in_sanity_window(ms));
            }
        }
    }
}
