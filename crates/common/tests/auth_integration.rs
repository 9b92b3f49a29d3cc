//! Integration tests for the auth module
//!
//! Exercises token managers end to end over the public API: persistence
//! through the host storage adapter, expiry handling, and host-bridge
//! priority.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use serde_json::json;
use shoplink_common::auth::{
    AccessTokenProvider, BridgeTokenStore, HostAuthBridge, HybridTokenManager, NativeStorage,
    StorageKeys, TokenInfo, TokenManager,
};
use shoplink_common::testing::{
    encode_test_jwt, jwt_expiring_at, MemoryTokenStore, MockHostBridge, MockNativeStorage,
};
use shoplink_common::time::MockClock;
use shoplink_domain::User;

const NOW_SECS: i64 = 1_750_000_000;

fn clock() -> MockClock {
    MockClock::at_millis(NOW_SECS * 1000)
}

/// Validates that a token record written through the host storage adapter
/// lands under the expected keys and reads back intact.
#[tokio::test]
async fn token_record_persists_through_native_storage() -> anyhow::Result<()> {
    let native = Arc::new(MockNativeStorage::new());
    let storage: Arc<dyn NativeStorage> = native.clone();
    let manager = TokenManager::new(Arc::new(BridgeTokenStore::new(Some(storage))))
        .with_clock(Arc::new(clock()));

    let token = jwt_expiring_at("user-1", NOW_SECS + 3600);
    let info = TokenInfo::new(&token)
        .with_refresh_token("refresh-1")
        .with_user(User::new("user-1").with_name("Ada"));
    manager.set_token_info(&info).await?;

    let stored = native.snapshot();
    assert_eq!(stored.get("auth_token"), Some(&token));
    assert_eq!(stored.get("refresh_token").map(String::as_str), Some("refresh-1"));
    assert_eq!(stored.get("token_expiry"), Some(&((NOW_SECS + 3600) * 1000).to_string()));
    assert!(stored.get("user_info").is_some_and(|u| u.contains("Ada")));

    assert_eq!(manager.get_valid_token().await, Some(token));
    assert_eq!(manager.get_user().await.and_then(|u| u.name).as_deref(), Some("Ada"));
    Ok(())
}

/// Validates that a manager without any storage backend behaves as
/// permanently unauthenticated instead of failing.
#[tokio::test]
async fn manager_without_backend_is_unauthenticated() {
    let manager = TokenManager::new(Arc::new(BridgeTokenStore::new(None)));

    manager.set_token_info(&TokenInfo::new(jwt_expiring_at("u", i64::MAX / 2000))).await.unwrap();

    assert!(!manager.is_authenticated().await);
    assert_eq!(manager.get_user().await, None);
    manager.clear_tokens().await.unwrap();
}

/// Validates the expiry table: tokens an hour ahead are valid, an hour
/// behind are expired, and malformed tokens are always expired.
#[tokio::test]
async fn expiry_detection_matrix() {
    let manager =
        TokenManager::new(Arc::new(MemoryTokenStore::new())).with_clock(Arc::new(clock()));

    let cases = [
        (jwt_expiring_at("u", NOW_SECS + 3600), false),
        (jwt_expiring_at("u", NOW_SECS - 3600), true),
        ("header.payload".to_string(), true),
        ("header.***.sig".to_string(), true),
        ("eyJhbGciOiJub25lIn0.bm90IGpzb24.sig".to_string(), true),
        (encode_test_jwt(&json!({"sub": "no-exp"})), true),
    ];

    for (token, expected) in cases {
        assert_eq!(manager.is_token_expired(&token), expected, "token {token}");
    }
}

/// Validates that prefixed keys keep two managers sharing one store apart.
#[tokio::test]
async fn prefixed_keys_isolate_managers() {
    let store = Arc::new(MemoryTokenStore::new());
    let buyer = TokenManager::new(Arc::clone(&store))
        .with_keys(StorageKeys::with_prefix("buyer."))
        .with_clock(Arc::new(clock()));
    let seller = TokenManager::new(Arc::clone(&store))
        .with_keys(StorageKeys::with_prefix("seller."))
        .with_clock(Arc::new(clock()));

    let token = jwt_expiring_at("buyer", NOW_SECS + 60);
    buyer.set_token_info(&TokenInfo::new(&token)).await.unwrap();

    assert_eq!(buyer.get_valid_token().await, Some(token));
    assert_eq!(seller.get_valid_token().await, None);

    seller.clear_tokens().await.unwrap();
    assert!(buyer.is_authenticated().await);
}

/// Validates host priority and best-effort synchronisation through the
/// provider seam used by the HTTP client.
#[tokio::test]
async fn hybrid_manager_through_provider_seam() {
    let host_token = jwt_expiring_at("host", NOW_SECS + 3600);
    let bridge = Arc::new(MockHostBridge::new().with_token(&host_token));
    let dyn_bridge: Arc<dyn HostAuthBridge> = bridge.clone();

    let base = TokenManager::new(Arc::new(MemoryTokenStore::new())).with_clock(Arc::new(clock()));
    base.set_token_info(&TokenInfo::new(jwt_expiring_at("local", NOW_SECS + 3600)))
        .await
        .unwrap();
    let hybrid = HybridTokenManager::new(base, Some(dyn_bridge));
    let provider: Arc<dyn AccessTokenProvider> = Arc::new(hybrid.clone());

    assert_eq!(provider.access_token().await, Some(host_token));

    provider.invalidate().await.unwrap();

    assert_eq!(bridge.logout_calls(), 1);
    assert_eq!(provider.access_token().await, None);
    assert_eq!(hybrid.get_user().await, None);
}

/// Validates that concurrent writers never leave a record that yields an
/// unusable token: every read is either a token some writer stored, or none.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_yield_a_stored_token() {
    let manager = Arc::new(
        TokenManager::new(Arc::new(MemoryTokenStore::new())).with_clock(Arc::new(clock())),
    );
    let tokens: Vec<String> =
        (0..8).map(|i| jwt_expiring_at(&format!("user-{i}"), NOW_SECS + 600)).collect();

    let mut handles = Vec::new();
    for token in tokens.clone() {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.set_token_info(&TokenInfo::new(token)).await.unwrap();
            manager.get_valid_token().await
        }));
    }

    for handle in handles {
        let seen = handle.await.unwrap();
        assert!(seen.is_some_and(|t| tokens.contains(&t)));
    }
}
