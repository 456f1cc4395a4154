//! In-memory response caching.
//!
//! This module provides the `CacheManager`, a TTL map from cache key to
//! JSON payload. Only GET responses are stored; entries are checked for
//! staleness when read and dropped then (no background sweep).
//!
//! Cache keys are built with [`cache_key`] from the endpoint and its
//! serialized query parameters.

pub mod manager;

pub use manager::{cache_key, CacheEntry, CacheManager, DEFAULT_CACHE_TTL};
