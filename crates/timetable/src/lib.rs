//! # tofmt Timetable
//!
//! The in-memory boss respawn timetable.
//!
//! ## Structure
//! - **Catalog**: every configured area, built from a [`CatalogConfig`]
//! - **Area**: one game zone, an ordered set of lines unique by number
//! - **Line**: one parallel server instance, an ordered set of bosses unique by name
//! - **Boss**: kill time and respawn duration for one encounter
//!
//! Lines and areas memoize their filtered views and lookup tables. Every
//! mutating method on the owning aggregate drops those caches before it
//! returns, so a reader never sees a stale projection.
//!
//! [`CatalogConfig`]: tofmt_config::CatalogConfig

pub mod area;
pub mod boss;
pub mod cache;
pub mod catalog;
pub mod line;
pub mod validate;

pub use area::{Area, RespawnEntry};
pub use boss::{Boss, BossRef, DEFAULT_RESPAWN_TIME};
pub use cache::{CacheStats, ProjectionCache, DEFAULT_CACHE_CAPACITY};
pub use catalog::{Catalog, CatalogLimits};
pub use line::Line;
