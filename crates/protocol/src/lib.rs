//! # tofmt Protocol
//!
//! Wire format for sharing a timetable between participants.
//!
//! ## Layers
//!
//! ### 1. Codecs ([`codecs`])
//! Big-endian fixed-width integers and `u8`-length-prefixed strings.
//!
//! ### 2. Snapshot ([`snapshot`])
//! Areas, lines and bosses plus the two exclusion sets, validated against
//! the receiving catalog's limits on decode.
//!
//! ### 3. Compression ([`compression`])
//! Optional zlib, bzip2 or zstd stage; the method is tagged in the frame.
//!
//! ### 4. Envelope ([`envelope`])
//! Versioned, command-tagged frame around a snapshot. Unknown versions are
//! rejected before the payload is touched.
//!
//! ### 5. Text ([`text`])
//! Base64 wrapping for channels that only carry text.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use tofmt_config::CatalogConfig;
//! use tofmt_protocol::{SyncEnvelope, WireOptions};
//! use tofmt_timetable::Catalog;
//!
//! # fn main() -> tofmt_core::Result<()> {
//! let catalog = Catalog::build(&CatalogConfig::default(), &BTreeMap::new(), None)?;
//! let envelope = SyncEnvelope::create(&catalog, &[], &[])?;
//! let text = envelope.to_text(&WireOptions::default())?;
//!
//! let received = SyncEnvelope::from_text(&text, catalog.limits())?;
//! assert_eq!(received.payload, envelope.payload);
//! # Ok(())
//! # }
//! ```

pub mod codecs;
pub mod compression;
pub mod envelope;
pub mod snapshot;
pub mod text;

pub use compression::{compress, compress_with_level, decompress, CompressionType};
pub use envelope::{SyncEnvelope, WireOptions, PROTOCOL_VERSION, SYNC_COMMAND};
pub use snapshot::Snapshot;
pub use text::{from_transport_text, to_transport_text};
