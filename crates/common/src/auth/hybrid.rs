//! Hybrid token manager
//!
//! Wraps a [`TokenManager`] with an optional host bridge. When the bridge is
//! available the host is the source of truth for reads, and writes are
//! mirrored to it on a best-effort basis. All local persistence goes through
//! the wrapped manager.

use std::sync::Arc;

use shoplink_domain::User;
use tracing::{debug, info, warn};

use super::bridge::{HostAuthBridge, HostBridge};
use super::store::TokenStore;
use super::token_manager::{TokenManager, TokenManagerError};
use super::types::TokenInfo;

/// Token manager that prefers the host shell's auth state
#[derive(Debug, Clone)]
pub struct HybridTokenManager<S: TokenStore> {
    base: TokenManager<S>,
    bridge: HostBridge,
}

impl<S: TokenStore> HybridTokenManager<S> {
    /// `bridge` is resolved once here and never re-evaluated.
    #[must_use]
    pub fn new(base: TokenManager<S>, bridge: Option<Arc<dyn HostAuthBridge>>) -> Self {
        let bridge = HostBridge::detect(bridge);
        debug!(host_bridge = bridge.is_available(), "Hybrid token manager created");
        Self { base, bridge }
    }

    pub fn base(&self) -> &TokenManager<S> {
        &self.base
    }

    pub fn has_host_bridge(&self) -> bool {
        self.bridge.is_available()
    }

    /// Access token from the host if it has one, else from local storage.
    pub async fn get_token(&self) -> Option<String> {
        if let Some(token) = self.host_auth().await.and_then(|(token, _)| token) {
            return Some(token);
        }
        self.base.get_token().await
    }

    /// User from the host if it has one, else from local storage.
    pub async fn get_user(&self) -> Option<User> {
        if let Some(user) = self.host_auth().await.and_then(|(_, user)| user) {
            return Some(user);
        }
        self.base.get_user().await
    }

    /// Persist locally, then push to the host when one is present.
    ///
    /// # Errors
    /// Only local persistence failures are returned; a failed host sync is
    /// logged.
    pub async fn set_token_info(&self, info: &TokenInfo) -> Result<(), TokenManagerError> {
        self.base.set_token_info(info).await?;

        if let Some(bridge) = self.bridge.as_bridge() {
            if let Err(e) = bridge.sync_token(&info.access_token, info.user.as_ref()).await {
                warn!(error = %e, "Host token sync failed");
            }
        }
        Ok(())
    }

    /// Clear locally, then end the host session when one is present.
    ///
    /// # Errors
    /// Only local store failures are returned; a failed host logout is
    /// logged.
    pub async fn clear_tokens(&self) -> Result<(), TokenManagerError> {
        let local = self.base.clear_tokens().await;

        if let Some(bridge) = self.bridge.as_bridge() {
            if let Err(e) = bridge.logout().await {
                warn!(error = %e, "Host logout failed");
            }
        }
        local
    }

    /// Mirror the host's session into local storage.
    ///
    /// Returns `true` when a host token was found and stored.
    ///
    /// # Errors
    /// Returns an error if writing the mirrored record fails.
    pub async fn initialize_from_native(&self) -> Result<bool, TokenManagerError> {
        let Some((token, user)) = self.host_auth().await else {
            return Ok(false);
        };
        let Some(token) = token else {
            debug!("Host bridge has no stored session");
            return Ok(false);
        };

        let mut info = TokenInfo::new(token);
        info.user = user;
        self.base.set_token_info(&info).await?;
        info!("Local token store initialized from host session");
        Ok(true)
    }

    /// A usable token, resolved with host priority.
    ///
    /// An expired token is refreshed through the wrapped manager when
    /// possible; otherwise both local and host state are cleared.
    pub async fn get_valid_token(&self) -> Option<String> {
        let token = self.get_token().await?;
        if !self.base.is_token_expired(&token) {
            return Some(token);
        }

        if let Some(refreshed) = self.base.refresh_expired().await {
            if let Some(bridge) = self.bridge.as_bridge() {
                let user = refreshed.user.as_ref();
                if let Err(e) = bridge.sync_token(&refreshed.access_token, user).await {
                    warn!(error = %e, "Host token sync failed");
                }
            }
            return Some(refreshed.access_token);
        }

        if let Err(e) = self.clear_tokens().await {
            warn!(error = %e, "Failed to clear expired tokens");
        }
        None
    }

    pub async fn is_authenticated(&self) -> bool {
        self.get_valid_token().await.is_some()
    }

    /// `None` when there is no bridge or the bridge call failed.
    async fn host_auth(&self) -> Option<(Option<String>, Option<User>)> {
        let bridge = self.bridge.as_bridge()?;
        match bridge.get_stored_auth().await {
            Ok(stored) => Some((stored.token.filter(|t| !t.is_empty()), stored.user)),
            Err(e) => {
                warn!(error = %e, "Host auth lookup failed; using local store");
                None
            }
        }
    }
}
