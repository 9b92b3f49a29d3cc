//! ShopLink backend API client
//!
//! - [`errors`]: the [`ApiError`] taxonomy and retry/auth-expiry predicates
//! - [`messages`]: user-facing text for failed calls
//! - [`client`]: the request executor

pub mod client;
pub mod errors;
pub mod messages;

pub use client::{
    ApiClient, ApiClientBuilder, AuthExpiredHandler, ClearTokensOnExpiry, LogAuthExpired,
    RequestOptions, RetryCondition,
};
pub use errors::{is_auth_expired, is_retryable, ApiError, ApiErrorKind};
pub use messages::{to_user_message, UserMessage};
