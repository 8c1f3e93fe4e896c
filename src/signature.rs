//! Webhook signature verification.
//!
//! Sanity signs each delivery with HMAC-SHA256 and sends the result in the
//! `sanity-webhook-signature` header:
//!
//! ```text
//! t=<unix millis>,v1=<base64url(HMAC-SHA256(secret, "<t>.<raw body>"))>
//! ```
//!
//! The digest is base64url without padding. Verification runs over the raw
//! request bytes, before any JSON parsing.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "sanity-webhook-signature";

type HmacSha256 = Hmac<Sha256>;

/// Returns `true` when `header` is a well-formed signature of `raw_body`
/// under `secret`. Comparison is constant-time.
pub fn is_valid_signature(raw_body: &[u8], header: &str, secret: &str) -> bool {
    let Some(parts) = parse_header(header) else {
        return false;
    };
    let Ok(expected) = URL_SAFE_NO_PAD.decode(parts.signature.trim_end_matches('=')) else {
        return false;
    };
    let Ok(mac) = keyed_mac(secret, parts.timestamp, raw_body) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

/// Build a signature header for `raw_body` at `timestamp_ms`.
pub fn sign(raw_body: &[u8], secret: &str, timestamp_ms: i64) -> String {
    let timestamp = timestamp_ms.to_string();
    let digest = match keyed_mac(secret, &timestamp, raw_body) {
        Ok(mac) => URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()),
        Err(_) => String::new(),
    };
    format!("t={},v1={}", timestamp, digest)
}

/// [`sign`] with the current time.
pub fn sign_now(raw_body: &[u8], secret: &str) -> String {
    sign(raw_body, secret, chrono::Utc::now().timestamp_millis())
}

fn keyed_mac(
    secret: &str,
    timestamp: &str,
    raw_body: &[u8],
) -> Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    Ok(mac)
}

struct SignatureParts<'a> {
    timestamp: &'a str,
    signature: &'a str,
}

fn parse_header(header: &str) -> Option<SignatureParts<'_>> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = Some(t),
            Some(("v1", v)) => signature = Some(v),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s))
            if !t.is_empty() && !s.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(SignatureParts {
                timestamp: t,
                signature: s,
            })
        }
        _ => None,
    }
}
