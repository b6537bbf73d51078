//! # Timetable Sharing
//!
//! One owner broadcasts its timetable, any number of followers mirror it.
//!
//! ## Modules
//!
//! - `timetable` - The catalog plus the exclusion filters that travel with it
//! - `transport` - The byte-moving seam and an in-process implementation
//! - `session` - Share/follow state machine

pub mod session;
pub mod timetable;
pub mod transport;

pub use session::{SessionState, SyncSession};
pub use timetable::{SharedTimetable, Timetable};
pub use transport::{ChannelTransport, Transport, TransportEvent};
