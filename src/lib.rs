//! Crazy Farm - game backend for a Telegram mini app
//!
//! Players authenticate with signed Telegram launch data, then grow plants
//! on their fields, complete tasks for rewards and invite friends.
//!
//! ## Components
//!
//! - **Auth**: Init data verification and HS256 session tokens
//! - **Store**: MongoDB persistence, with an in-memory store for dev mode
//! - **Progression**: Task check and claim with at-most-once rewards
//! - **Subscriptions**: Channel membership checks over NATS

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod nats;
pub mod routes;
pub mod server;
pub mod services;
pub mod telegram;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{FarmError, Result};
