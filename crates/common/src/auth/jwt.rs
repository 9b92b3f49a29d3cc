//! JWT payload decoding without signature verification
//!
//! Only the payload segment is read, and only to find the `exp` claim. The
//! signature is never checked: the backend remains the authority on token
//! validity, the client merely avoids sending tokens it already knows are
//! stale.
//!
//! Every failure (wrong segment count, bad base64url, non-UTF-8, non-JSON,
//! missing `exp`) collapses into a single [`JwtDecodeError`]. Callers treat
//! that as "expired".

use serde_json::Value;
use thiserror::Error;

/// The token could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to decode JWT payload: {reason}")]
pub struct JwtDecodeError {
    reason: String,
}

impl JwtDecodeError {
    fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Base64 decoding strategy, chosen once when the decoder is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base64Decoder {
    /// The `base64` crate engine
    #[cfg(feature = "native-base64")]
    Engine,
    /// Built-in lookup-table decoder
    Table,
}

impl Default for Base64Decoder {
    fn default() -> Self {
        Self::detect()
    }
}

impl Base64Decoder {
    /// Prefer the crate engine when compiled in, otherwise use the table.
    #[cfg(feature = "native-base64")]
    pub fn detect() -> Self {
        Self::Engine
    }

    /// Prefer the crate engine when compiled in, otherwise use the table.
    #[cfg(not(feature = "native-base64"))]
    pub fn detect() -> Self {
        Self::Table
    }

    /// Decode standard-alphabet, padded base64.
    pub fn decode(self, input: &str) -> Option<Vec<u8>> {
        match self {
            #[cfg(feature = "native-base64")]
            Self::Engine => engine::decode(input),
            Self::Table => table::decode(input),
        }
    }
}

#[cfg(feature = "native-base64")]
mod engine {
    use base64::alphabet;
    use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
    use base64::Engine as _;

    // Lenient about trailing bits, like browser `atob`, so both strategies
    // accept the same inputs.
    const LENIENT: GeneralPurpose = GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_allow_trailing_bits(true)
            .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
    );

    pub(super) fn decode(input: &str) -> Option<Vec<u8>> {
        LENIENT.decode(input).ok()
    }
}

mod table {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    const INVALID: u8 = 0xFF;
    const DECODE: [u8; 256] = build_table();

    const fn build_table() -> [u8; 256] {
        let mut table = [INVALID; 256];
        let mut i = 0;
        while i < ALPHABET.len() {
            table[ALPHABET[i] as usize] = i as u8;
            i += 1;
        }
        table
    }

    pub(super) fn decode(input: &str) -> Option<Vec<u8>> {
        let bytes = input.as_bytes();
        if bytes.len() % 4 != 0 {
            return None;
        }

        let padding = bytes.iter().rev().take_while(|&&b| b == b'=').count();
        if padding > 2 {
            return None;
        }
        let data = &bytes[..bytes.len() - padding];

        let mut out = Vec::with_capacity(data.len() * 3 / 4);
        let mut buffer: u32 = 0;
        let mut bits: u32 = 0;
        for &byte in data {
            let value = DECODE[byte as usize];
            if value == INVALID {
                return None;
            }
            buffer = (buffer << 6) | u32::from(value);
            bits += 6;
            if bits >= 8 {
                bits -= 8;
                out.push((buffer >> bits) as u8);
                buffer &= (1 << bits) - 1;
            }
        }
        Some(out)
    }
}

/// Convert a base64url segment to padded standard base64.
fn to_standard_padded(segment: &str) -> String {
    let mut converted: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while converted.len() % 4 != 0 {
        converted.push('=');
    }
    converted
}

/// Decodes JWT payloads with a fixed base64 strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JwtDecoder {
    base64: Base64Decoder,
}

impl JwtDecoder {
    /// Decoder using the best available base64 strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder pinned to a specific base64 strategy.
    pub fn with_base64(base64: Base64Decoder) -> Self {
        Self { base64 }
    }

    pub fn base64(&self) -> Base64Decoder {
        self.base64
    }

    /// Decode the payload (middle) segment of a compact JWT into JSON.
    ///
    /// # Errors
    /// Returns [`JwtDecodeError`] unless the token has exactly three
    /// segments and the middle one is base64url-encoded UTF-8 JSON.
    pub fn decode_payload(&self, token: &str) -> Result<Value, JwtDecodeError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(JwtDecodeError::new(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let bytes = self
            .base64
            .decode(&to_standard_padded(segments[1]))
            .ok_or_else(|| JwtDecodeError::new("payload is not valid base64url"))?;
        let text =
            String::from_utf8(bytes).map_err(|_| JwtDecodeError::new("payload is not UTF-8"))?;
        serde_json::from_str(&text)
            .map_err(|e| JwtDecodeError::new(format!("payload is not JSON: {e}")))
    }

    /// The `exp` claim in epoch seconds.
    ///
    /// # Errors
    /// Returns [`JwtDecodeError`] if decoding fails or `exp` is missing or
    /// not numeric.
    pub fn expiry_seconds(&self, token: &str) -> Result<i64, JwtDecodeError> {
        let payload = self.decode_payload(token)?;
        let exp = payload.get("exp").ok_or_else(|| JwtDecodeError::new("missing exp claim"))?;
        exp.as_i64()
            .or_else(|| exp.as_f64().map(|f| f.floor() as i64))
            .ok_or_else(|| JwtDecodeError::new("exp claim is not a number"))
    }

    /// Whether the token is expired at `now_secs`.
    ///
    /// Undecodable tokens count as expired.
    pub fn is_expired_at(&self, token: &str, now_secs: i64) -> bool {
        match self.expiry_seconds(token) {
            Ok(exp) => now_secs >= exp,
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::encode_test_jwt;

    fn strategies() -> Vec<Base64Decoder> {
        vec![Base64Decoder::detect(), Base64Decoder::Table]
    }

    #[test]
    fn decodes_payload_with_every_strategy() {
        let payload = json!({"sub": "u-1", "exp": 1_700_000_000, "roles": ["buyer", "seller"]});
        let token = encode_test_jwt(&payload);

        for strategy in strategies() {
            let decoded = JwtDecoder::with_base64(strategy).decode_payload(&token).unwrap();
            assert_eq!(decoded, payload, "strategy {strategy:?}");
        }
    }

    #[test]
    fn decodes_url_safe_characters() {
        // "?>?" encodes to "Pz4/" in standard base64 and "Pz4_" in base64url
        let payload = json!({"note": "?>?>?>", "exp": 1});
        let token = encode_test_jwt(&payload);

        for strategy in strategies() {
            assert_eq!(JwtDecoder::with_base64(strategy).decode_payload(&token).unwrap(), payload);
        }
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let decoder = JwtDecoder::new();
        assert!(decoder.decode_payload("only.two").is_err());
        assert!(decoder.decode_payload("a.b.c.d").is_err());
        assert!(decoder.decode_payload("").is_err());
    }

    #[test]
    fn rejects_invalid_base64() {
        for strategy in strategies() {
            let decoder = JwtDecoder::with_base64(strategy);
            assert!(decoder.decode_payload("h.!!!!.s").is_err());
            // Length 5 can never be valid base64 after padding to 8
            assert!(decoder.decode_payload("h.abcde.s").is_err());
        }
    }

    #[test]
    fn rejects_non_json_payload() {
        // "not json" in base64url
        let token = "eyJhbGciOiJIUzI1NiJ9.bm90IGpzb24.sig";
        for strategy in strategies() {
            assert!(JwtDecoder::with_base64(strategy).decode_payload(token).is_err());
        }
    }

    #[test]
    fn table_decoder_matches_known_vectors() {
        assert_eq!(table::decode("").unwrap(), b"");
        assert_eq!(table::decode("Zg==").unwrap(), b"f");
        assert_eq!(table::decode("Zm8=").unwrap(), b"fo");
        assert_eq!(table::decode("Zm9v").unwrap(), b"foo");
        assert_eq!(table::decode("Zm9vYmFy").unwrap(), b"foobar");
        assert!(table::decode("Zm9").is_none());
        assert!(table::decode("Z===").is_none());
        assert!(table::decode("Zm=v").is_none());
    }

    #[test]
    fn expiry_handles_integer_and_float_claims() {
        let decoder = JwtDecoder::new();
        assert_eq!(decoder.expiry_seconds(&encode_test_jwt(&json!({"exp": 100}))).unwrap(), 100);
        assert_eq!(decoder.expiry_seconds(&encode_test_jwt(&json!({"exp": 100.9}))).unwrap(), 100);
        assert!(decoder.expiry_seconds(&encode_test_jwt(&json!({"sub": "x"}))).is_err());
        assert!(decoder.expiry_seconds(&encode_test_jwt(&json!({"exp": "soon"}))).is_err());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let decoder = JwtDecoder::new();
        let token = encode_test_jwt(&json!({"exp": 1_000}));
        assert!(!decoder.is_expired_at(&token, 999));
        assert!(decoder.is_expired_at(&token, 1_000));
        assert!(decoder.is_expired_at("garbage", 0));
    }
}
