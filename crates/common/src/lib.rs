//! Runtime building blocks shared across ShopLink crates.
//!
//! - [`resilience`]: bounded retry with exponential backoff and jitter
//! - [`auth`]: token stores, JWT expiry detection, token managers and the
//!   host bridge capability
//! - [`time`]: wall-clock abstraction used for expiry decisions
//!
//! # Features
//!
//! - `native-base64` (default): decode JWT payloads with the `base64` crate
//!   instead of the built-in table decoder
//! - `platform` (default): `KeychainTokenStore` backed by the OS credential
//!   store
//! - `test-utils`: in-memory doubles and JWT fixtures in [`testing`]

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod resilience;
pub mod time;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{
    AccessTokenProvider, HybridTokenManager, TokenInfo, TokenManager, TokenManagerError, TokenStore,
};
pub use resilience::{retry_with_policy, Jitter, RetryConfig, RetryExecutor, RetryPolicy};
pub use time::{Clock, MockClock, SystemClock};
