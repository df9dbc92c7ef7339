//! Time-boxed response cache
//!
//! Entries carry their own expiry. Expired entries are evicted lazily on
//! lookup and periodically by a sweep, so keys nobody asks for again are
//! still reclaimed.

mod store;

pub use store::{CacheEntry, CacheStats, CacheStore};
