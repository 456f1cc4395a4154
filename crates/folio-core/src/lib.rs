//! Folio Core - API client, token lifecycle, cache, and resource stores.
//!
//! This crate contains the client-side session layer for the folio
//! portfolio site. It can be used by the CLI or any other front end.
//!
//! Data flows from a store action through [`ApiClient`] to the backend;
//! responses flow back the same way, with [`CacheManager`] short-circuiting
//! repeated GETs and [`TokenManager`] gating the `Authorization` header.

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod models;
pub mod stores;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResponse, RequestOptions};
pub use auth::{TokenManager, TokenRecord, TokenStore};
pub use cache::CacheManager;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, TokenBackend};
pub use stores::Stores;
