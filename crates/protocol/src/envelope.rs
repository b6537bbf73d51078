//! Sync envelope
//!
//! The unit handed to and received from the transport. The frame header
//! carries the version, command tag, creation time, and the compression
//! method of the snapshot payload that follows.
//!
//! # Frame
//! ```text
//! version      u32     only PROTOCOL_VERSION is accepted
//! command      str8
//! created_at   i64     unix milliseconds
//! compression  u8      see CompressionType
//! payload_len  u32
//! payload      [u8]    snapshot bytes, compressed per the tag
//! ```
//!
//! Any frame may additionally be wrapped as base64 text.

use crate::codecs::*;
use crate::compression::{self, CompressionType};
use crate::snapshot::Snapshot;
use crate::text;
use bytes::{Bytes, BytesMut};
use tofmt_core::{LineNumber, Result, TimerError, Timestamp, ValidationError};
use tofmt_timetable::{Catalog, CatalogLimits};

/// Envelope version this build reads and writes
pub const PROTOCOL_VERSION: u32 = 1;

/// Command tag of a timetable sync
pub const SYNC_COMMAND: &str = "tofmt/sync";

/// How an envelope is put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireOptions {
    pub compression: CompressionType,
    /// `None` uses the method's default level
    pub level: Option<u32>,
    /// Wrap the frame as base64 text
    pub text: bool,
}

impl Default for WireOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Zstd,
            level: None,
            text: false,
        }
    }
}

/// Versioned, command-tagged snapshot container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEnvelope {
    pub version: u32,
    pub command: String,
    pub created_at: Timestamp,
    pub payload: Snapshot,
}

impl SyncEnvelope {
    /// Capture `catalog` with the given exclusions, stamped now
    pub fn create(catalog: &Catalog, bosses_exclude: &[String], lines_exclude: &[LineNumber]) -> Result<Self> {
        Ok(Self::from_snapshot(Snapshot::capture(catalog, bosses_exclude, lines_exclude)?))
    }

    pub fn from_snapshot(payload: Snapshot) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command: SYNC_COMMAND.to_string(),
            created_at: Timestamp::now(),
            payload,
        }
    }

    /// Encode to a binary frame with the given compression
    pub fn encode(&self, options: &WireOptions) -> Result<Vec<u8>> {
        let payload = self.payload.encode()?;
        let level = options.level.unwrap_or_else(|| options.compression.default_level());
        let payload = compression::compress_with_level(&payload, options.compression, level)?;

        let payload_len = u32::try_from(payload.len()).map_err(|_| ValidationError::TooLong {
            field: "payload",
            len: payload.len(),
            max: u32::MAX as usize,
        })?;

        let mut buf = BytesMut::with_capacity(payload.len() + 32);
        write_u32(&mut buf, self.version);
        write_str8(&mut buf, "command", &self.command)?;
        write_i64(&mut buf, self.created_at.as_millis());
        write_u8(&mut buf, options.compression.as_u8());
        write_u32(&mut buf, payload_len);
        buf.extend_from_slice(&payload);

        tracing::trace!(
            "Encoded envelope: {} byte frame, {} compression",
            buf.len(),
            options.compression.as_str()
        );
        Ok(buf.to_vec())
    }

    /// Encode for the transport, as text bytes when `options.text` is set
    pub fn to_transport(&self, options: &WireOptions) -> Result<Vec<u8>> {
        let frame = self.encode(options)?;
        if options.text {
            Ok(text::to_transport_text(&frame).into_bytes())
        } else {
            Ok(frame)
        }
    }

    pub fn to_text(&self, options: &WireOptions) -> Result<String> {
        Ok(text::to_transport_text(&self.encode(options)?))
    }

    /// Decode a binary frame.
    ///
    /// The version is checked before anything else is parsed.
    pub fn decode(bytes: &[u8], limits: &CatalogLimits) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(bytes);

        let version = read_u32(&mut buf)?;
        if version != PROTOCOL_VERSION {
            return Err(ValidationError::UnsupportedVersion(version).into());
        }

        let command = read_str8(&mut buf)?;
        if command != SYNC_COMMAND {
            return Err(ValidationError::UnknownCommand(command).into());
        }

        let created_at = Timestamp::from_millis(read_i64(&mut buf)?);
        if created_at < Timestamp::EPOCH {
            return Err(ValidationError::OutOfRange {
                field: "created at (ms)",
                value: created_at.as_millis(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let tag = read_u8(&mut buf)?;
        let method = CompressionType::from_u8(tag)
            .ok_or_else(|| TimerError::Decode(format!("unknown compression tag {tag}")))?;

        let payload_len = read_u32(&mut buf)? as usize;
        let payload = read_bytes(&mut buf, payload_len)?;
        expect_end(&buf, "envelope")?;

        let payload = compression::decompress(&payload, method)?;
        let payload = Snapshot::decode(&payload, limits)?;

        Ok(Self {
            version,
            command,
            created_at,
            payload,
        })
    }

    pub fn from_text(text: &str, limits: &CatalogLimits) -> Result<Self> {
        Self::decode(&text::from_transport_text(text)?, limits)
    }

    /// Decode bytes from the transport, binary or text-wrapped
    pub fn from_transport(bytes: &[u8], limits: &CatalogLimits) -> Result<Self> {
        if text::is_transport_text(bytes) {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| TimerError::Decode(format!("invalid transport text: {e}")))?;
            Self::from_text(text, limits)
        } else {
            Self::decode(bytes, limits)
        }
    }
}
