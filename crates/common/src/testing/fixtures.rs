//! JWT fixtures
//!
//! Tokens are encoded with the `base64` crate's URL-safe engine so decoder
//! tests run against an independent reference encoder. Signatures are
//! placeholders; nothing in this workspace verifies them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{json, Value};

const TEST_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Encode `payload` as a compact JWT with a dummy signature.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shoplink_common::testing::encode_test_jwt;
///
/// let token = encode_test_jwt(&json!({"exp": 1}));
/// assert_eq!(token.split('.').count(), 3);
/// ```
pub fn encode_test_jwt(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(TEST_HEADER);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.test-signature")
}

/// A token for `subject` whose `exp` claim is `exp_secs`.
pub fn jwt_expiring_at(subject: &str, exp_secs: i64) -> String {
    encode_test_jwt(&json!({"sub": subject, "exp": exp_secs}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_unpadded_base64url() {
        let token = jwt_expiring_at("user-1", 1_700_000_000);
        let parts: Vec<&str> = token.split('.').collect();

        assert_eq!(parts.len(), 3);
        assert!(parts[..2].iter().all(|p| !p.contains('=') && !p.contains('+')));
    }
}
