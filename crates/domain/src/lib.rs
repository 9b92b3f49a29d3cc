//! # ShopLink Domain
//!
//! Data types shared by every ShopLink crate.
//!
//! This crate contains:
//! - The authenticated [`User`] snapshot returned by the backend
//! - API client configuration ([`ApiConfig`], [`Environment`])
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other ShopLink crates
//! - No I/O; pure data structures

pub mod config;
pub mod errors;
pub mod user;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use user::User;
