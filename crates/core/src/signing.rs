//! Inbound webhook authentication.
//!
//! The provider signs each delivery with HMAC-SHA256 over
//! `{timestamp}.{body}` and sends the Unix timestamp and a
//! `v1,<base64-hmac>` signature in headers. Verification recomputes the
//! signature and compares in constant time, and the timestamp must fall
//! within a bounded tolerance window so captured deliveries cannot be
//! replayed later.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme version prefix.
pub const SIGNATURE_PREFIX: &str = "v1,";

/// Default timestamp tolerance window in seconds (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Sign a payload: base64 HMAC-SHA256 over `{timestamp}.{payload}`,
/// prefixed with the scheme version.
///
/// Exposed so tests (and any outbound delivery simulation) produce
/// signatures byte-identical to the provider's.
pub fn sign_payload(timestamp: i64, payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let signature = mac.finalize().into_bytes();

    format!("{SIGNATURE_PREFIX}{}", BASE64_STANDARD.encode(signature))
}

/// Verify a delivery signature against the shared secret.
pub fn verify_signature(timestamp: i64, payload: &str, signature: &str, secret: &str) -> bool {
    let Some(received) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let expected = sign_payload(timestamp, payload, secret);
    let expected = expected
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or(&expected);

    constant_time_eq(received.as_bytes(), expected.as_bytes())
}

/// Whether a delivery timestamp is within the tolerance window around
/// `now`. Both future and past skew are bounded.
pub fn within_tolerance(timestamp: i64, now: i64, tolerance_secs: i64) -> bool {
    (now - timestamp).abs() <= tolerance_secs
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
