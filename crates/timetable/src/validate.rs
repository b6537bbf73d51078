//! Field validation shared by construction and decode
//!
//! Every entity runs these checks in its constructor, so a value that
//! exists is a valid value.

use std::time::Duration;
use tofmt_core::{ValidationError, MAX_STRING_LEN};

/// Non-empty, at most 255 bytes
pub fn name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    max_len(field, value)
}

/// At most 255 bytes
pub fn max_len(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_STRING_LEN {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max: MAX_STRING_LEN,
        });
    }
    Ok(())
}

/// `#` followed by 3, 4, 6 or 8 hex digits
pub fn hex_color(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .strip_prefix('#')
        .filter(|hex| matches!(hex.len(), 3 | 4 | 6 | 8))
        .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()));

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor(value.to_string()))
    }
}

/// Respawn durations travel as `u32` milliseconds
pub fn respawn_time(value: Duration) -> Result<(), ValidationError> {
    let ms = value.as_millis();
    if ms > u128::from(u32::MAX) {
        return Err(ValidationError::OutOfRange {
            field: "respawn time (ms)",
            value: i64::try_from(ms).unwrap_or(i64::MAX),
            min: 0,
            max: i64::from(u32::MAX),
        });
    }
    Ok(())
}

/// Collection size bound
pub fn count(field: &'static str, len: usize, max: usize) -> Result<(), ValidationError> {
    if len > max {
        return Err(ValidationError::TooMany { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(name("name", "a").is_ok());
        assert!(name("name", &"a".repeat(255)).is_ok());
        assert_eq!(
            name("name", &"a".repeat(256)),
            Err(ValidationError::TooLong { field: "name", len: 256, max: 255 })
        );
        assert_eq!(name("name", ""), Err(ValidationError::Empty { field: "name" }));
    }

    #[test]
    fn test_name_counts_bytes() {
        // 3 bytes per CJK character
        assert!(name("name", &"索".repeat(85)).is_ok());
        assert!(name("name", &"索".repeat(86)).is_err());
    }

    #[test]
    fn test_hex_color() {
        for ok in ["#BB0001", "#fff", "#FFFA", "#00000000"] {
            assert!(hex_color(ok).is_ok(), "{ok}");
        }
        for bad in ["", "BB0001", "#BB00A", "#GG0001", "#BB00011"] {
            assert!(hex_color(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_respawn_time_bound() {
        assert!(respawn_time(Duration::from_millis(u64::from(u32::MAX))).is_ok());
        assert!(respawn_time(Duration::from_millis(u64::from(u32::MAX) + 1)).is_err());
    }
}
