//! Token types and storage keys

use serde::{Deserialize, Serialize};
use shoplink_domain::User;

/// Authentication state produced by login, registration or refresh
///
/// `access_token` is a JWT in compact serialization. When `expiry_time` is
/// absent the manager derives it from the token's `exp` claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl TokenInfo {
    /// Token info carrying only an access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expiry_time: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_expiry_time(mut self, expiry_millis: i64) -> Self {
        self.expiry_time = Some(expiry_millis);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }
}

/// Names of the four entries that make up one stored token record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access_token: String,
    pub refresh_token: String,
    pub user: String,
    pub expiry: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix("")
    }
}

impl StorageKeys {
    /// Keys namespaced by `prefix` (useful when several clients share a
    /// store).
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            access_token: format!("{prefix}auth_token"),
            refresh_token: format!("{prefix}refresh_token"),
            user: format!("{prefix}user_info"),
            expiry: format!("{prefix}token_expiry"),
        }
    }

    /// All keys, in the order they are written.
    pub fn all(&self) -> [&str; 4] {
        [&self.access_token, &self.refresh_token, &self.user, &self.expiry]
    }
}
