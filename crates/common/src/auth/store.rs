//! Token store abstraction and adapters
//!
//! A token store is an async string-to-string map with three operations.
//! Calls are independent: there is no ordering or atomicity across keys.
//!
//! Adapters degrade instead of failing when their backing mechanism is
//! missing: reads return `None` and writes/removes succeed without doing
//! anything. That keeps code written against [`TokenStore`] usable in
//! headless test runners and on hosts without a credential service.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "platform")]
use keyring::Entry;
use thiserror::Error;
#[cfg(feature = "platform")]
use tracing::{debug, warn};

use super::bridge::{BridgeError, NativeStorage};

/// Store backend failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Token store backend failed for '{key}': {message}")]
    Backend { key: String, message: String },
}

impl StoreError {
    pub fn backend(key: &str, message: impl Into<String>) -> Self {
        Self::Backend { key: key.to_string(), message: message.into() }
    }
}

/// Async key/value persistence for auth state
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }
}

/// Local persistent store backed by the platform credential service
///
/// macOS Keychain, Windows Credential Manager or the Linux kernel keyring,
/// via the `keyring` crate. When the platform service is unavailable the
/// store behaves as an empty no-op store.
#[cfg(feature = "platform")]
#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    service_name: String,
}

#[cfg(feature = "platform")]
impl KeychainTokenStore {
    /// Create a store namespaced under `service_name` (e.g. "ShopLink.auth").
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// `None` when the platform has no usable credential service.
    fn entry(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        match Entry::new(&self.service_name, key) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if backend_unavailable(&e) => {
                warn!(service = %self.service_name, key, error = %e, "Credential store missing");
                Ok(None)
            }
            Err(e) => Err(StoreError::backend(key, e.to_string())),
        }
    }
}

#[cfg(feature = "platform")]
fn backend_unavailable(error: &keyring::Error) -> bool {
    matches!(error, keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_))
}

#[cfg(feature = "platform")]
#[async_trait]
impl TokenStore for KeychainTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(entry) = self.entry(key)? else {
            return Ok(None);
        };
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) if backend_unavailable(&e) => {
                warn!(service = %self.service_name, key, error = %e, "Credential read skipped");
                Ok(None)
            }
            Err(e) => Err(StoreError::backend(key, e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let Some(entry) = self.entry(key)? else {
            return Ok(());
        };
        match entry.set_password(value) {
            Ok(()) => {
                debug!(service = %self.service_name, key, "Credential stored");
                Ok(())
            }
            Err(e) if backend_unavailable(&e) => {
                warn!(service = %self.service_name, key, error = %e, "Credential write skipped");
                Ok(())
            }
            Err(e) => Err(StoreError::backend(key, e.to_string())),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let Some(entry) = self.entry(key)? else {
            return Ok(());
        };
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) if backend_unavailable(&e) => {
                warn!(service = %self.service_name, key, error = %e, "Credential delete skipped");
                Ok(())
            }
            Err(e) => Err(StoreError::backend(key, e.to_string())),
        }
    }
}

/// Store backed by the host shell's native persistence channel
///
/// Built without a channel (`BridgeTokenStore::new(None)`) it is an empty
/// no-op store.
#[derive(Clone, Default)]
pub struct BridgeTokenStore {
    storage: Option<Arc<dyn NativeStorage>>,
}

impl BridgeTokenStore {
    pub fn new(storage: Option<Arc<dyn NativeStorage>>) -> Self {
        Self { storage }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }
}

impl std::fmt::Debug for BridgeTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeTokenStore").field("available", &self.is_available()).finish()
    }
}

fn bridge_failure(key: &str, error: &BridgeError) -> StoreError {
    StoreError::backend(key, error.to_string())
}

#[async_trait]
impl TokenStore for BridgeTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match &self.storage {
            Some(storage) => storage.get_item(key).await.map_err(|e| bridge_failure(key, &e)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => {
                storage.set_item(key, value).await.map_err(|e| bridge_failure(key, &e))
            }
            None => Ok(()),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => storage.remove_item(key).await.map_err(|e| bridge_failure(key, &e)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryTokenStore, MockNativeStorage};

    #[tokio::test]
    async fn bridge_store_without_channel_is_noop() {
        let store = BridgeTokenStore::new(None);
        assert!(!store.is_available());

        store.set("auth_token", "value").await.unwrap();
        assert_eq!(store.get("auth_token").await.unwrap(), None);
        store.remove("auth_token").await.unwrap();
    }

    #[tokio::test]
    async fn bridge_store_delegates_to_native_storage() {
        let native = Arc::new(MockNativeStorage::new());
        let store = BridgeTokenStore::new(Some(native.clone()));

        store.set("auth_token", "abc").await.unwrap();
        assert_eq!(native.snapshot().get("auth_token").map(String::as_str), Some("abc"));
        assert_eq!(store.get("auth_token").await.unwrap().as_deref(), Some("abc"));

        store.remove("auth_token").await.unwrap();
        assert_eq!(store.get("auth_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn bridge_store_surfaces_channel_failures() {
        let native = Arc::new(MockNativeStorage::new());
        native.fail_with("bridge offline");
        let store = BridgeTokenStore::new(Some(native));

        let err = store.get("auth_token").await.unwrap_err();
        assert!(err.to_string().contains("bridge offline"));
    }

    #[tokio::test]
    async fn arc_store_forwards() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
