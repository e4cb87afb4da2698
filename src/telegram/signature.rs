//! Init data signature verification
//!
//! Telegram signs the launch payload with a key derived from the bot token:
//!
//! ```text
//! secret_key = HMAC-SHA256(key = "WebAppData", data = bot_token)
//! hash       = hex(HMAC-SHA256(key = secret_key, data = data_check_string))
//! ```
//!
//! where `data_check_string` is every `key=value` pair except `hash`, sorted
//! and joined with `\n`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use tracing::warn;

use super::init_data::InitDataFields;
use crate::config::{InitDataPolicy, VerifyMode};

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Init data verification failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("init data has unexpected format")]
    UnexpectedFormat,

    #[error("sign is missing")]
    SignatureMissing,

    #[error("auth_date is missing")]
    DateMissing,

    #[error("init data is expired")]
    Expired,

    #[error("sign is invalid")]
    SignatureInvalid,
}

fn signing_mac(bot_token: &str) -> Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut derive = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)?;
    derive.update(bot_token.as_bytes());
    let secret_key = derive.finalize().into_bytes();
    HmacSha256::new_from_slice(&secret_key)
}

fn data_check_string<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut lines: Vec<String> = pairs
        .filter(|(key, _)| *key != "hash")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    lines.sort();
    lines.join("\n")
}

/// Compute the hex signature for a field set with the given `auth_date`.
///
/// Any `hash` or `auth_date` already present in `fields` is ignored.
pub fn sign_init_data(fields: &InitDataFields, bot_token: &str, auth_date: i64) -> String {
    let auth_date = auth_date.to_string();
    let pairs = fields
        .iter()
        .filter(|(key, _)| *key != "auth_date")
        .chain(std::iter::once(("auth_date", auth_date.as_str())));

    // HMAC keys of any length are accepted, so this never fails in practice
    let mut mac = match signing_mac(bot_token) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(data_check_string(pairs).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify signature and freshness of decoded init data.
///
/// `now` is the current unix time in seconds. Checks run in order:
/// missing hash, missing `auth_date` (only when `ttl` is set), expiry,
/// signature.
pub fn verify_init_data(
    fields: &InitDataFields,
    bot_token: &str,
    ttl: Option<Duration>,
    now: i64,
) -> Result<(), InitDataError> {
    let hash = match fields.get("hash") {
        Some(h) if !h.is_empty() => h,
        _ => return Err(InitDataError::SignatureMissing),
    };

    if let Some(ttl) = ttl {
        let auth_date = fields
            .get("auth_date")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v != 0)
            .ok_or(InitDataError::DateMissing)?;

        let age = now.saturating_sub(auth_date);
        if age > 0 && Duration::from_secs(age as u64) > ttl {
            return Err(InitDataError::Expired);
        }
    }

    let expected = hex::decode(hash).map_err(|_| InitDataError::SignatureInvalid)?;
    let mut mac = signing_mac(bot_token).map_err(|_| InitDataError::SignatureInvalid)?;
    mac.update(data_check_string(fields.iter()).as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| InitDataError::SignatureInvalid)
}

/// Decode a raw query string and verify it under the configured policy.
///
/// In `VerifyMode::Permissive` a stale or mis-signed payload is accepted with
/// a warning; a missing hash or `auth_date` is still rejected.
pub fn validate_init_data(
    raw: &str,
    bot_token: &str,
    policy: &InitDataPolicy,
    now: i64,
) -> Result<InitDataFields, InitDataError> {
    let fields = InitDataFields::from_query(raw)?;

    match verify_init_data(&fields, bot_token, policy.ttl, now) {
        Ok(()) => Ok(fields),
        Err(err @ (InitDataError::Expired | InitDataError::SignatureInvalid))
            if policy.mode == VerifyMode::Permissive =>
        {
            warn!("Accepting init data despite '{}' (verification is permissive)", err);
            Ok(fields)
        }
        Err(err) => Err(err),
    }
}
