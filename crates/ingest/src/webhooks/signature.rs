//! Webhook signature verification.
//!
//! Shopify signs each webhook with HMAC-SHA256 over the raw request body,
//! keyed by the app's shared secret, and sends the base64 digest in
//! `X-Shopify-Hmac-Sha256`. Verification must run on the bytes exactly as
//! received, before any JSON parsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the base64 HMAC-SHA256 signature of `body`.
#[must_use]
pub fn sign(body: &[u8], secret: &SecretString) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify a webhook body against its provided signature.
///
/// The comparison is constant-time in the digest. A signature that is not
/// valid base64 is rejected.
#[must_use]
pub fn verify(body: &[u8], provided_signature: &str, secret: &SecretString) -> bool {
    let Ok(provided) = BASE64.decode(provided_signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
