//! Request signing for the Bitso REST API.
//!
//! Every private request carries
//! `Authorization: Bitso <key>:<nonce>:<signature>` where the signature is the
//! hex HMAC-SHA256 of `nonce + method + path + body` keyed by the API secret.

use std::sync::atomic::{AtomicU64, Ordering};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// API credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Public API key.
    pub key: String,
    /// API secret used as the HMAC key.
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

static LAST_NONCE: AtomicU64 = AtomicU64::new(0);

/// Microseconds since the Unix epoch, strictly increasing within the process.
///
/// Bitso rejects a nonce that is not greater than the last one it saw for the
/// key, so concurrent requests in the same microsecond get successive values.
pub fn nonce() -> String {
    let now = u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0);
    let mut last = LAST_NONCE.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_NONCE.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next.to_string(),
            Err(actual) => last = actual,
        }
    }
}

/// Hex HMAC-SHA256 of the request description.
pub fn sign_request(
    secret: &str,
    nonce: &str,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Signing(format!("invalid HMAC key: {}", e)))?;
    mac.update(nonce.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Value of the `Authorization` header for a request.
pub fn authorization_header(
    credentials: &Credentials,
    nonce: &str,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let signature = sign_request(&credentials.secret, nonce, method, path, body)?;
    Ok(format!("Bitso {}:{}:{}", credentials.key, nonce, signature))
}
