//! Core error types for tofmt

/// Field-level constraint violations.
///
/// Raised at construction, decode, and bulk-setter boundaries. A value that
/// fails validation is never partially applied.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is {len} bytes, limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{field} has {len} entries, limit is {max}")]
    TooMany {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("invalid hex color: {0:?}")]
    InvalidColor(String),

    #[error("excluded boss {0:?} is not a known boss")]
    UnknownExclusion(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown envelope command {0:?}")]
    UnknownCommand(String),

    #[error("unknown area {0:?}")]
    UnknownArea(String),

    #[error("unknown line {0}")]
    UnknownLine(u8),

    #[error("unknown boss {0:?}")]
    UnknownBoss(String),
}

#[derive(thiserror::Error, Debug)]
pub enum TimerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timetable is a read-only mirror while following")]
    ReadOnlyMirror,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TimerError {
    /// The validation failure behind this error, if any
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TimerError>;
