//! Authentication module for managing the API token lifecycle.
//!
//! This module provides:
//! - `TokenManager`: token, type, expiry and "remember me" bookkeeping
//! - `TokenStore`: the key-value persistence the manager writes through,
//!   with in-memory, JSON file and OS keychain implementations
//!
//! Tokens expire after 24 hours by default, or 30 days when remembered.
//! Expiry is checked lazily on read; nothing sweeps in the background.

pub mod store;
pub mod token;

pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use token::{TokenManager, TokenRecord, DEFAULT_TOKEN_TYPE};
