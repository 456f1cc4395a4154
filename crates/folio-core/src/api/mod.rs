//! REST API client module for the folio backend.
//!
//! This module provides the `ApiClient` for talking to the portfolio site's
//! API: blog posts, portfolio items, contact messages, tags, uploads and
//! health checks.
//!
//! Requests carry a `Authorization: <type> <token>` header whenever the
//! `TokenManager` holds a valid token. Every failure is normalized into an
//! `ApiError` before it leaves this module.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ApiClient, LOGIN_ENDPOINT};
pub use error::{ApiError, ErrorBody};
pub use request::{ApiResponse, RequestBody, RequestOptions, UploadFile};
