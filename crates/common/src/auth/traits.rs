//! Seam between token managers and the HTTP client
//!
//! The request executor only needs two things from auth state: a token to
//! attach, and a way to drop that state when the backend reports expiry.

use async_trait::async_trait;

use super::hybrid::HybridTokenManager;
use super::store::TokenStore;
use super::token_manager::{TokenManager, TokenManagerError};

/// Supplies bearer tokens for outgoing requests
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A currently valid access token, or `None` when unauthenticated.
    async fn access_token(&self) -> Option<String>;

    /// Drop all stored auth state.
    async fn invalidate(&self) -> Result<(), TokenManagerError>;
}

#[async_trait]
impl<S: TokenStore + 'static> AccessTokenProvider for TokenManager<S> {
    async fn access_token(&self) -> Option<String> {
        self.get_valid_token().await
    }

    async fn invalidate(&self) -> Result<(), TokenManagerError> {
        self.clear_tokens().await
    }
}

#[async_trait]
impl<S: TokenStore + 'static> AccessTokenProvider for HybridTokenManager<S> {
    async fn access_token(&self) -> Option<String> {
        self.get_valid_token().await
    }

    async fn invalidate(&self) -> Result<(), TokenManagerError> {
        self.clear_tokens().await
    }
}

/// Provider for unauthenticated clients
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl AccessTokenProvider for NoAuth {
    async fn access_token(&self) -> Option<String> {
        None
    }

    async fn invalidate(&self) -> Result<(), TokenManagerError> {
        Ok(())
    }
}
