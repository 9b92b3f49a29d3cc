//! Authentication state
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  HybridTokenManager  │  host-first reads, best-effort host sync
//! └──────────┬───────────┘
//!            │
//!            ├──► HostBridge          (Available(bridge) | Absent)
//!            │
//!            └──► TokenManager        (persistence + expiry detection)
//!                      │
//!                      ├──► JwtDecoder    (exp claim, no verification)
//!                      └──► TokenStore    (KeychainTokenStore, BridgeTokenStore)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shoplink_common::auth::{BridgeTokenStore, TokenInfo, TokenManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TokenManager::new(Arc::new(BridgeTokenStore::new(None)));
//! manager.set_token_info(&TokenInfo::new("header.payload.signature")).await?;
//!
//! if let Some(token) = manager.get_valid_token().await {
//!     println!("Authorization: Bearer {token}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod hybrid;
pub mod jwt;
pub mod store;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use bridge::{BridgeError, HostAuthBridge, HostBridge, NativeStorage, StoredAuth};
pub use hybrid::HybridTokenManager;
pub use jwt::{Base64Decoder, JwtDecodeError, JwtDecoder};
#[cfg(feature = "platform")]
pub use store::KeychainTokenStore;
pub use store::{BridgeTokenStore, StoreError, TokenStore};
pub use token_manager::{TokenManager, TokenManagerError, TokenRefresher};
pub use traits::{AccessTokenProvider, NoAuth};
pub use types::{StorageKeys, TokenInfo};
