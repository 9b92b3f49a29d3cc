//! In-memory doubles for the auth seams

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shoplink_domain::User;

use crate::auth::{BridgeError, HostAuthBridge, NativeStorage, StoreError, StoredAuth, TokenStore};

type StorageData = Arc<Mutex<HashMap<String, String>>>;
type Failure = Arc<Mutex<Option<String>>>;

/// Token store kept in memory
///
/// Clones share the same data. [`MemoryTokenStore::fail_with`] makes every
/// subsequent call fail, to exercise error paths.
///
/// ```
/// # tokio_test::block_on(async {
/// use shoplink_common::auth::TokenStore;
/// use shoplink_common::testing::MemoryTokenStore;
///
/// let store = MemoryTokenStore::new();
/// store.set("auth_token", "abc").await.unwrap();
/// assert_eq!(store.get("auth_token").await.unwrap().as_deref(), Some("abc"));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    data: StorageData,
    failure: Failure,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every later call with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Copy of the current contents
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.data.lock().unwrap().clone()
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        match self.failure.lock().unwrap().as_deref() {
            Some(message) => Err(StoreError::backend(key, message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check(key)?;
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check(key)?;
        self.data.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check(key)?;
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Host-side key/value channel kept in memory
#[derive(Debug, Clone, Default)]
pub struct MockNativeStorage {
    data: StorageData,
    failure: Failure,
}

impl MockNativeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.data.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), BridgeError> {
        match self.failure.lock().unwrap().as_deref() {
            Some(message) => Err(BridgeError::CallFailed(message.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NativeStorage for MockNativeStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, BridgeError> {
        self.check()?;
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), BridgeError> {
        self.check()?;
        self.data.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), BridgeError> {
        self.check()?;
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct HostState {
    auth: StoredAuth,
    synced: Vec<String>,
    logouts: usize,
    failure: Option<String>,
}

/// Scriptable host auth bridge
///
/// Records every `sync_token` and `logout` call. A successful logout drops
/// the host session, like a real shell would.
#[derive(Debug, Clone, Default)]
pub struct MockHostBridge {
    state: Arc<Mutex<HostState>>,
}

impl MockHostBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host session holding `token`.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.state.lock().unwrap().auth.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().auth.user = Some(user);
        self
    }

    /// Fail every later bridge call with `message`.
    pub fn fail_with(&self, message: &str) {
        self.state.lock().unwrap().failure = Some(message.to_string());
    }

    /// Tokens pushed through successful `sync_token` calls, oldest first
    #[must_use]
    pub fn synced_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().synced.clone()
    }

    /// Number of `logout` calls, including failed ones
    #[must_use]
    pub fn logout_calls(&self) -> usize {
        self.state.lock().unwrap().logouts
    }

    #[must_use]
    pub fn stored_auth(&self) -> StoredAuth {
        self.state.lock().unwrap().auth.clone()
    }
}

fn scripted_failure(state: &HostState) -> Result<(), BridgeError> {
    match &state.failure {
        Some(message) => Err(BridgeError::CallFailed(message.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl HostAuthBridge for MockHostBridge {
    async fn get_stored_auth(&self) -> Result<StoredAuth, BridgeError> {
        let state = self.state.lock().unwrap();
        scripted_failure(&state)?;
        Ok(state.auth.clone())
    }

    async fn sync_token(&self, token: &str, user: Option<&User>) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        scripted_failure(&state)?;
        state.synced.push(token.to_string());
        state.auth = StoredAuth { token: Some(token.to_string()), user: user.cloned() };
        Ok(())
    }

    async fn logout(&self) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.logouts += 1;
        scripted_failure(&state)?;
        state.auth = StoredAuth::default();
        Ok(())
    }
}
