//! Access token expiry decoding.
//!
//! Tokens are JWTs; only the `exp` claim of the payload segment is read. The
//! signature is not verified, that is the backend's job. Anything that cannot
//! be decoded counts as expired.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Returns the instant encoded in the token's `exp` claim, if decodable.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    // Accept both alphabets and optional padding.
    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    let exp = claims.get("exp")?.as_f64()?;
    if !exp.is_finite() {
        return None;
    }
    let millis = (exp * 1000.0) as i64;
    DateTime::from_timestamp_millis(millis)
}

/// Fail-closed expiry check against an explicit clock.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match expires_at(token) {
        Some(exp) => exp < now,
        None => true,
    }
}

/// Fail-closed expiry check against the system clock.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}
