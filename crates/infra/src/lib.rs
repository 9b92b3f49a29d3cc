//! # ShopLink Infrastructure
//!
//! I/O-facing pieces of the ShopLink client core.
//!
//! This crate contains:
//! - The backend API client: error taxonomy, user messages and the request
//!   executor ([`api`])
//! - The single-attempt HTTP transport ([`http`])
//! - Configuration loading from environment and files ([`config`])
//! - Tracing bootstrap ([`observability`])
//!
//! ## Architecture
//! - Depends on `shoplink-domain` for config types and `shoplink-common` for
//!   auth state and retry
//! - Contains all network and filesystem code

pub mod api;
pub mod config;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{ApiClient, ApiError, ApiErrorKind, RequestOptions};
pub use http::HttpClient;
pub use observability::init_tracing;
