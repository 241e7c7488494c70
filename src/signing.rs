//! HMAC-based URL signing and verification
//!
//! Tokens are base64url-encoded HMAC-SHA256 digests over the canonical path
//! and the expiry timestamp. Expiry travels as a query parameter, not inside
//! the token: `verify` checks the caller's assertion, and callers must also
//! check `now < expires_at` themselves before trusting a token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Minimum signed-URL lifetime in seconds
pub const MIN_TTL_SECS: i64 = 1;
/// Default signed-URL lifetime in seconds
pub const DEFAULT_TTL_SECS: i64 = 60;

/// Signs and verifies time-limited URL tokens with a shared secret
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac_for(&self, canonical_path: &str, expires_at: i64) -> Option<HmacSha256> {
        if self.secret.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(canonical_path.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        Some(mac)
    }

    /// Produce a token for `canonical_path` valid until `expires_at`.
    /// Returns an empty string when no secret is configured.
    pub fn sign(&self, canonical_path: &str, expires_at: i64) -> String {
        match self.mac_for(canonical_path, expires_at) {
            Some(mac) => URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()),
            None => String::new(),
        }
    }

    /// Verify a token against a path and expiry assertion.
    ///
    /// False on empty secret or token, on decode failure, or on digest
    /// mismatch; the comparison is constant-time via `Mac::verify_slice`.
    pub fn verify(&self, canonical_path: &str, expires_at: i64, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let Some(mac) = self.mac_for(canonical_path, expires_at) else {
            return false;
        };
        let Ok(raw) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };
        mac.verify_slice(&raw).is_ok()
    }

    /// Append `token` and `expires` query parameters to `canonical_path`.
    /// The TTL is clamped to at least one second.
    pub fn sign_url(&self, canonical_path: &str, ttl_secs: i64) -> String {
        let ttl = ttl_secs.max(MIN_TTL_SECS);
        let expires_at = chrono::Utc::now().timestamp() + ttl;
        let token = self.sign(canonical_path, expires_at);
        format!("{canonical_path}?token={token}&expires={expires_at}")
    }
}
