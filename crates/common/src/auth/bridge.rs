//! Host bridge capability
//!
//! When the client runs inside a native shell, the shell may inject an
//! object exposing its own auth session and key/value persistence. The
//! presence of that object is decided once, at construction, and carried as
//! a [`HostBridge`] value instead of being re-probed on every call.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shoplink_domain::User;
use thiserror::Error;

/// Errors reported by the embedding host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Host bridge call failed: {0}")]
    CallFailed(String),

    #[error("Host bridge returned malformed data: {0}")]
    Malformed(String),
}

/// Auth state held by the host shell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredAuth {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Auth operations exposed by the host shell
#[async_trait]
pub trait HostAuthBridge: Send + Sync {
    /// The host's current session, if any.
    async fn get_stored_auth(&self) -> Result<StoredAuth, BridgeError>;

    /// Push a freshly obtained token (and user) to the host.
    async fn sync_token(&self, token: &str, user: Option<&User>) -> Result<(), BridgeError>;

    /// Ask the host to end its session.
    async fn logout(&self) -> Result<(), BridgeError>;
}

/// Key/value persistence exposed by the host shell
#[async_trait]
pub trait NativeStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, BridgeError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), BridgeError>;
    async fn remove_item(&self, key: &str) -> Result<(), BridgeError>;
}

/// Whether an auth bridge was injected, fixed at construction
#[derive(Clone, Default)]
pub enum HostBridge {
    Available(Arc<dyn HostAuthBridge>),
    #[default]
    Absent,
}

impl HostBridge {
    /// Wrap an optionally injected bridge.
    pub fn detect(injected: Option<Arc<dyn HostAuthBridge>>) -> Self {
        injected.map_or(Self::Absent, Self::Available)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn as_bridge(&self) -> Option<&Arc<dyn HostAuthBridge>> {
        match self {
            Self::Available(bridge) => Some(bridge),
            Self::Absent => None,
        }
    }
}

impl fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(_) => f.write_str("HostBridge::Available"),
            Self::Absent => f.write_str("HostBridge::Absent"),
        }
    }
}
