//! Data models for the portfolio site's API resources.
//!
//! This module contains the request and response types exchanged with the
//! backend:
//!
//! - `LoginRequest`, `LoginResponse`, `User`: authentication
//! - `BlogPost`, `BlogPostInput`: blog articles
//! - `PortfolioItem`, `PortfolioInput`: portfolio projects
//! - `ContactMessage`, `NewContactMessage`: contact form submissions
//! - `Tag`, `TagInput`: post tags
//! - `UploadedFile`: image uploads
//! - `HealthStatus`, `EndpointCheck`: system status

pub mod auth;
pub mod blog;
pub mod message;
pub mod portfolio;
pub mod system;
pub mod tag;
pub mod upload;

pub use auth::{LoginRequest, LoginResponse, User};
pub use blog::{BlogPost, BlogPostInput};
pub use message::{ContactMessage, MessageStatusUpdate, NewContactMessage};
pub use portfolio::{PortfolioInput, PortfolioItem};
pub use system::{EndpointCheck, HealthStatus};
pub use tag::{Tag, TagInput};
pub use upload::UploadedFile;
