//! Text-safe wrapping for channels that only carry strings
//!
//! Standard padded base64. Surrounding whitespace is ignored on decode so
//! pasted text survives.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tofmt_core::{Result, TimerError};

pub fn to_transport_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_transport_text(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| TimerError::Decode(format!("invalid transport text: {e}")))
}

/// Whether `bytes` look like wrapped text rather than a binary frame.
///
/// Binary frames open with a big-endian version whose high byte is zero.
pub fn is_transport_text(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
}
