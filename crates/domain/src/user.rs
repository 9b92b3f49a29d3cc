//! Authenticated user snapshot
//!
//! The backend returns the user alongside tokens on login, registration and
//! refresh. The client stores it verbatim so unknown fields survive a
//! save/load cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User snapshot persisted next to the access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Backend fields this client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Minimal user with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), email: None, name: None, role: None, extra: Map::new() }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
