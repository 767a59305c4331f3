//! CI webhook signature verification using HMAC-SHA256.
//!
//! The CI service signs `Timestamp=<ts>.<raw body>` with the shared secret and
//! sends `<scheme> Timestamp=<ts>; Signature=<hex>` in the `Authorization`
//! header. Verification runs on the raw bytes before the body is parsed.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Parsed `Authorization` header of a signed delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: String,
    pub signature: Vec<u8>,
}

/// Parses `<scheme> Timestamp=<ts>; Signature=<hex>`.
///
/// The scheme word is optional and not checked. Returns `None` for malformed
/// headers (missing parameters, invalid hex, etc.). Never panics.
pub fn parse_signature_header(header: &str) -> Option<SignatureHeader> {
    let header = header.trim();
    let params = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) if !scheme.contains('=') => rest,
        _ => header,
    };

    let mut timestamp = None;
    let mut signature = None;
    for part in params.split(';') {
        let (key, value) = part.trim().split_once('=')?;
        match key.trim() {
            "Timestamp" => timestamp = Some(value.trim().to_string()),
            "Signature" => signature = Some(hex::decode(value.trim()).ok()?),
            _ => {}
        }
    }

    let timestamp = timestamp.filter(|t| !t.is_empty())?;
    Some(SignatureHeader {
        timestamp,
        signature: signature?,
    })
}

/// The bytes that get signed: `Timestamp=<ts>.<payload>`
fn signed_message(timestamp: &str, payload: &[u8]) -> Vec<u8> {
    let mut message = format!("Timestamp={}.", timestamp).into_bytes();
    message.extend_from_slice(payload);
    message
}

/// Computes the HMAC-SHA256 signature of a delivery.
///
/// This is useful for testing purposes (generating expected signatures).
pub fn compute_signature(timestamp: &str, payload: &[u8], secret: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(&signed_message(timestamp, payload));
    Some(mac.finalize().into_bytes().to_vec())
}

/// Formats a signature as an `Authorization` header value.
pub fn format_signature_header(scheme: &str, timestamp: &str, signature: &[u8]) -> String {
    format!(
        "{} Timestamp={}; Signature={}",
        scheme,
        timestamp,
        hex::encode(signature)
    )
}

/// Verifies a delivery signature against the payload and secret.
///
/// Returns `true` if the signature is valid, `false` otherwise.
/// Uses constant-time comparison via the HMAC library.
pub fn verify_signature(payload: &[u8], header: &str, secret: &[u8]) -> bool {
    let Some(parsed) = parse_signature_header(header) else {
        return false;
    };
    verify_parsed(payload, &parsed, secret)
}

fn verify_parsed(payload: &[u8], parsed: &SignatureHeader, secret: &[u8]) -> bool {
    // Anyone can sign with an empty key
    if secret.is_empty() {
        return false;
    }
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(&signed_message(&parsed.timestamp, payload));
    mac.verify_slice(&parsed.signature).is_ok()
}

/// Verifier holding the shared secret and replay policy
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    max_skew: Option<Duration>,
}

impl WebhookVerifier {
    /// `max_skew` of `None` accepts any timestamp
    pub fn new(secret: SecretString, max_skew: Option<Duration>) -> Self {
        Self { secret, max_skew }
    }

    /// Check the signature, then the timestamp window if one is configured
    pub fn verify(&self, payload: &[u8], header: &str) -> bool {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], header: &str, now_secs: i64) -> bool {
        let Some(parsed) = parse_signature_header(header) else {
            debug!("Malformed webhook signature header");
            return false;
        };

        if !verify_parsed(payload, &parsed, self.secret.expose_secret().as_bytes()) {
            return false;
        }

        match self.max_skew {
            None => true,
            Some(max_skew) => match parsed.timestamp.parse::<i64>() {
                Ok(ts) => now_secs.abs_diff(ts) <= max_skew.as_secs(),
                Err(_) => {
                    debug!("Non-numeric webhook timestamp {}", parsed.timestamp);
                    false
                }
            },
        }
    }
}
