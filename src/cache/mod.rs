//! Caching subsystem.
//!
//! - [`points::PointCache`]: bounded LRU cache of synthesized point sets,
//!   keyed on normalized topic and count. Process-lifetime only; nothing is
//!   persisted across restarts.

pub mod points;

pub use points::{CacheConfig, CacheEntry, CacheKey, PointCache, normalize_topic};
