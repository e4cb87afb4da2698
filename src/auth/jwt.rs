//! Session tokens
//!
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - The subject is the auth identity id
//! - Default expiry is 24 hours
//!
//! Verification failures are deliberately indistinct: callers only ever see
//! `FarmError::Unauthorized`, the reason is logged at debug.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

use crate::config::DEV_JWT_SECRET;
use crate::types::{FarmError, Result};

const MIN_SECRET_LEN: usize = 32;

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Auth identity id
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Session token issuer and verifier
#[derive(Clone)]
pub struct SessionIssuer {
    secret: String,
    ttl: Duration,
}

impl SessionIssuer {
    /// Create a new issuer
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, ttl: Duration) -> Result<Self> {
        if secret.is_empty() {
            return Err(FarmError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(FarmError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self { secret, ttl })
    }

    /// Issuer for dev mode with the built-in development secret
    pub fn new_dev() -> Self {
        Self {
            secret: DEV_JWT_SECRET.into(),
            ttl: Duration::from_secs(86400),
        }
    }

    /// Mint a token for an auth identity
    pub fn issue(&self, identity_id: Uuid) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| FarmError::TokenSigning(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: identity_id.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| FarmError::TokenSigning(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token and return the auth identity id it was issued for
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|err| {
            debug!("Session token rejected: {:?}", err.kind());
            FarmError::Unauthorized(String::new())
        })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| {
            debug!("Session token subject is not an identity id");
            FarmError::Unauthorized(String::new())
        })
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}
