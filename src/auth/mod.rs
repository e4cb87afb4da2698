//! Session authentication for the farm backend
//!
//! Provides:
//! - Session token issuance and verification (HS256 JWT)
//! - Bearer token extraction

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, SessionIssuer};
