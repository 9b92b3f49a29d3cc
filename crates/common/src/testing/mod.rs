//! Testing utilities
//!
//! - **[`mocks`]**: in-memory [`TokenStore`](crate::auth::TokenStore),
//!   host bridge and native storage doubles
//! - **[`fixtures`]**: JWT encoders for decoder and expiry tests
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-utils` feature.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{encode_test_jwt, jwt_expiring_at};
pub use mocks::{MemoryTokenStore, MockHostBridge, MockNativeStorage};
