//! Token manager
//!
//! Owns the stored token record (access token, refresh token, user and
//! expiry) and decides, without any network call, whether the access token
//! can still be used.
//!
//! Per stored token:
//! - Absent → Valid on [`TokenManager::set_token_info`]
//! - Valid → Expired once `now >= exp`
//! - Expired → Absent when no refresh succeeds (entries are cleared)
//! - any → Absent on [`TokenManager::clear_tokens`]
//!
//! The store is never locked. Concurrent callers may interleave writes; a
//! half-written record either still decodes to a usable token or fails the
//! expiry check and gets cleared.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shoplink_domain::User;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::jwt::{JwtDecodeError, JwtDecoder};
use super::store::{StoreError, TokenStore};
use super::types::{StorageKeys, TokenInfo};
use crate::time::{Clock, SystemClock};

/// Error type for token manager operations
#[derive(Debug, Error)]
pub enum TokenManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to serialize user: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Exchanges a refresh token for a new token record
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, TokenManagerError>;
}

/// Persists and validates the auth token record
pub struct TokenManager<S: TokenStore> {
    store: Arc<S>,
    keys: StorageKeys,
    decoder: JwtDecoder,
    clock: Arc<dyn Clock>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl<S: TokenStore> Clone for TokenManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            decoder: self.decoder,
            clock: Arc::clone(&self.clock),
            refresher: self.refresher.clone(),
        }
    }
}

impl<S: TokenStore> fmt::Debug for TokenManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("keys", &self.keys)
            .field("decoder", &self.decoder)
            .field("has_refresher", &self.refresher.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: TokenStore> TokenManager<S> {
    /// Manager over `store` with default keys, the system clock and no
    /// refresh capability.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            keys: StorageKeys::default(),
            decoder: JwtDecoder::new(),
            clock: Arc::new(SystemClock),
            refresher: None,
        }
    }

    #[must_use]
    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: JwtDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Refresh expired tokens through `refresher` instead of clearing them.
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Persist a token record.
    ///
    /// The refresh token and user are written only when present. The expiry
    /// entry is `info.expiry_time`, else the access token's `exp` claim in
    /// milliseconds; when neither is known any previous expiry is removed.
    ///
    /// # Errors
    /// Returns an error if a store write fails or the user cannot be
    /// serialized. Entries written before the failure stay written.
    pub async fn set_token_info(&self, info: &TokenInfo) -> Result<(), TokenManagerError> {
        self.store.set(&self.keys.access_token, &info.access_token).await?;

        if let Some(refresh_token) = &info.refresh_token {
            self.store.set(&self.keys.refresh_token, refresh_token).await?;
        }

        if let Some(user) = &info.user {
            let serialized = serde_json::to_string(user)?;
            self.store.set(&self.keys.user, &serialized).await?;
        }

        let expiry = info.expiry_time.or_else(|| {
            self.decoder.expiry_seconds(&info.access_token).ok().map(|exp| exp.saturating_mul(1000))
        });
        match expiry {
            Some(millis) => self.store.set(&self.keys.expiry, &millis.to_string()).await?,
            None => {
                debug!("No expiry known for stored token");
                self.store.remove(&self.keys.expiry).await?;
            }
        }

        info!(
            has_refresh = info.refresh_token.is_some(),
            has_user = info.user.is_some(),
            "Token info stored"
        );
        Ok(())
    }

    /// The stored access token, without any expiry check.
    pub async fn get_token(&self) -> Option<String> {
        self.read(&self.keys.access_token).await
    }

    pub async fn get_refresh_token(&self) -> Option<String> {
        self.read(&self.keys.refresh_token).await
    }

    /// The stored user snapshot. A corrupt entry reads as absent.
    pub async fn get_user(&self) -> Option<User> {
        let raw = self.read(&self.keys.user).await?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored user is not valid JSON");
                None
            }
        }
    }

    /// The stored expiry timestamp in epoch milliseconds.
    pub async fn get_expiry_time(&self) -> Option<i64> {
        let raw = self.read(&self.keys.expiry).await?;
        raw.trim().parse().ok()
    }

    /// A currently usable access token, or `None`.
    ///
    /// An expired token is refreshed when a refresher and a refresh token
    /// are available; otherwise the stored record is cleared.
    pub async fn get_valid_token(&self) -> Option<String> {
        let token = self.get_token().await?;
        if !self.is_token_expired(&token) {
            return Some(token);
        }

        debug!("Stored access token expired");
        if let Some(refreshed) = self.refresh_expired().await {
            return Some(refreshed.access_token);
        }

        if let Err(e) = self.clear_tokens().await {
            warn!(error = %e, "Failed to clear expired tokens");
        }
        None
    }

    /// Whether `token` is expired now. Undecodable tokens are expired.
    pub fn is_token_expired(&self, token: &str) -> bool {
        self.decoder.is_expired_at(token, self.clock.now_secs())
    }

    /// Decode a JWT payload with this manager's base64 strategy.
    ///
    /// # Errors
    /// Returns [`JwtDecodeError`] for any structural or encoding failure.
    pub fn decode_jwt_payload(&self, token: &str) -> Result<Value, JwtDecodeError> {
        self.decoder.decode_payload(token)
    }

    /// Remove all four entries.
    ///
    /// Every removal is attempted even if an earlier one fails; completed
    /// removals are not rolled back.
    ///
    /// # Errors
    /// Returns the first store error encountered.
    pub async fn clear_tokens(&self) -> Result<(), TokenManagerError> {
        let mut first_error = None;
        for key in self.keys.all() {
            if let Err(e) = self.store.remove(key).await {
                warn!(key, error = %e, "Failed to remove token entry");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                info!("Tokens cleared");
                Ok(())
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.get_valid_token().await.is_some()
    }

    /// Whole seconds until the stored expiry, zero once passed.
    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        let expiry = self.get_expiry_time().await?;
        let remaining = expiry.saturating_sub(self.clock.now_millis());
        Some(remaining.max(0) / 1000)
    }

    /// Try to replace an expired record via the refresher.
    ///
    /// `None` when there is no refresher, no refresh token, or the refresh
    /// (or persisting its result) fails.
    pub(crate) async fn refresh_expired(&self) -> Option<TokenInfo> {
        let refresher = self.refresher.as_ref()?;
        let refresh_token = self.get_refresh_token().await?;

        let mut info = match refresher.refresh(&refresh_token).await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                return None;
            }
        };
        if info.refresh_token.is_none() {
            info.refresh_token = Some(refresh_token);
        }

        if self.is_token_expired(&info.access_token) {
            warn!("Refresher returned an expired token");
            return None;
        }
        if let Err(e) = self.set_token_info(&info).await {
            warn!(error = %e, "Failed to persist refreshed tokens");
            return None;
        }
        info!("Access token refreshed");
        Some(info)
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Token store read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use super::*;
    use crate::testing::{encode_test_jwt, MemoryTokenStore};
    use crate::time::MockClock;

    const NOW_SECS: i64 = 1_700_000_000;

    fn jwt_expiring_at(exp: i64) -> String {
        encode_test_jwt(&json!({"sub": "user-1", "exp": exp}))
    }

    fn manager() -> (TokenManager<MemoryTokenStore>, Arc<MemoryTokenStore>, MockClock) {
        let store = Arc::new(MemoryTokenStore::new());
        let clock = MockClock::at_millis(NOW_SECS * 1000);
        let manager = TokenManager::new(Arc::clone(&store)).with_clock(Arc::new(clock.clone()));
        (manager, store, clock)
    }

    struct StaticRefresher {
        token: String,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenRefresher for StaticRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, TokenManagerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if refresh_token == "revoked" {
                return Err(TokenManagerError::RefreshFailed("revoked".into()));
            }
            Ok(TokenInfo::new(self.token.clone()))
        }
    }

    #[tokio::test]
    async fn set_then_get_valid_returns_same_token() {
        let (manager, _, _) = manager();
        let token = jwt_expiring_at(NOW_SECS + 3600);

        manager.set_token_info(&TokenInfo::new(&token)).await.unwrap();

        assert_eq!(manager.get_valid_token().await.as_deref(), Some(token.as_str()));
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn expiry_is_derived_from_exp_claim() {
        let (manager, _, _) = manager();
        let token = jwt_expiring_at(NOW_SECS + 60);

        manager.set_token_info(&TokenInfo::new(&token)).await.unwrap();

        assert_eq!(manager.get_expiry_time().await, Some((NOW_SECS + 60) * 1000));
        assert_eq!(manager.seconds_until_expiry().await, Some(60));
    }

    #[tokio::test]
    async fn explicit_expiry_wins_over_claim() {
        let (manager, _, _) = manager();
        let info = TokenInfo::new(jwt_expiring_at(NOW_SECS + 60)).with_expiry_time(42);

        manager.set_token_info(&info).await.unwrap();

        assert_eq!(manager.get_expiry_time().await, Some(42));
    }

    #[tokio::test]
    async fn undecodable_token_records_no_expiry() {
        let (manager, store, _) = manager();
        store.set("token_expiry", "123").await.unwrap();

        manager.set_token_info(&TokenInfo::new("not-a-jwt")).await.unwrap();

        assert_eq!(manager.get_expiry_time().await, None);
        assert_eq!(manager.get_token().await.as_deref(), Some("not-a-jwt"));
    }

    #[tokio::test]
    async fn optional_fields_written_only_when_present() {
        let (manager, store, _) = manager();

        manager.set_token_info(&TokenInfo::new(jwt_expiring_at(NOW_SECS + 10))).await.unwrap();
        assert!(store.snapshot().get("refresh_token").is_none());
        assert!(store.snapshot().get("user_info").is_none());

        let info = TokenInfo::new(jwt_expiring_at(NOW_SECS + 10))
            .with_refresh_token("r-1")
            .with_user(User::new("u-1").with_email("a@b.c"));
        manager.set_token_info(&info).await.unwrap();

        assert_eq!(manager.get_refresh_token().await.as_deref(), Some("r-1"));
        assert_eq!(manager.get_user().await.map(|u| u.id), Some("u-1".to_string()));
    }

    #[tokio::test]
    async fn expired_token_is_cleared_without_refresher() {
        let (manager, store, clock) = manager();
        let info = TokenInfo::new(jwt_expiring_at(NOW_SECS + 5))
            .with_refresh_token("r-1")
            .with_user(User::new("u-1"));
        manager.set_token_info(&info).await.unwrap();

        clock.advance_millis(5_000);

        assert_eq!(manager.get_valid_token().await, None);
        assert!(store.snapshot().is_empty());
        assert_eq!(manager.get_user().await, None);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_when_possible() {
        let (manager, _, clock) = manager();
        let fresh = jwt_expiring_at(NOW_SECS + 7200);
        let refresher =
            Arc::new(StaticRefresher { token: fresh.clone(), calls: AtomicU32::new(0) });
        let manager = manager.with_refresher(refresher.clone());

        let info = TokenInfo::new(jwt_expiring_at(NOW_SECS + 5)).with_refresh_token("r-1");
        manager.set_token_info(&info).await.unwrap();
        clock.advance_millis(10_000);

        assert_eq!(manager.get_valid_token().await.as_deref(), Some(fresh.as_str()));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        // Original refresh token is kept when the refresher issues none
        assert_eq!(manager.get_refresh_token().await.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn failed_refresh_clears_tokens() {
        let (manager, store, clock) = manager();
        let refresher = Arc::new(StaticRefresher {
            token: jwt_expiring_at(NOW_SECS + 7200),
            calls: AtomicU32::new(0),
        });
        let manager = manager.with_refresher(refresher);

        let info = TokenInfo::new(jwt_expiring_at(NOW_SECS + 5)).with_refresh_token("revoked");
        manager.set_token_info(&info).await.unwrap();
        clock.advance_millis(10_000);

        assert_eq!(manager.get_valid_token().await, None);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn clear_then_reads_return_none() {
        let (manager, _, _) = manager();
        let info = TokenInfo::new(jwt_expiring_at(NOW_SECS + 3600)).with_user(User::new("u-1"));
        manager.set_token_info(&info).await.unwrap();

        manager.clear_tokens().await.unwrap();

        assert_eq!(manager.get_valid_token().await, None);
        assert_eq!(manager.get_user().await, None);
        assert_eq!(manager.seconds_until_expiry().await, None);
    }

    #[tokio::test]
    async fn expiry_check_uses_clock_seconds() {
        let (manager, _, _) = manager();

        assert!(!manager.is_token_expired(&jwt_expiring_at(NOW_SECS + 3600)));
        assert!(manager.is_token_expired(&jwt_expiring_at(NOW_SECS - 3600)));
        assert!(manager.is_token_expired(&jwt_expiring_at(NOW_SECS)));
        assert!(manager.is_token_expired("two.segments"));
        assert!(manager.is_token_expired("a.%%%.c"));
    }

    #[tokio::test]
    async fn store_failures_read_as_absent() {
        let (manager, store, _) = manager();
        manager.set_token_info(&TokenInfo::new(jwt_expiring_at(NOW_SECS + 3600))).await.unwrap();

        store.fail_with("disk gone");

        assert_eq!(manager.get_valid_token().await, None);
        assert!(manager.set_token_info(&TokenInfo::new("x.y.z")).await.is_err());
        assert!(manager.clear_tokens().await.is_err());
    }

    #[tokio::test]
    async fn corrupt_user_entry_reads_as_none() {
        let (manager, store, _) = manager();
        store.set("user_info", "{not json").await.unwrap();

        assert_eq!(manager.get_user().await, None);
    }
}
