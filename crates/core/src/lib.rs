//! tofmt core - shared error taxonomy, timestamps and peer ids

mod error;
mod types;
mod idgen;

pub use error::*;
pub use types::*;
pub use idgen::*;
