//! NATS client wrapper
//!
//! Connection management and request/reply with a bounded wait.

use async_nats::{Client, ConnectOptions};
use bytes::Bytes;
use std::time::Duration;
use tracing::info;

use crate::config::NatsArgs;
use crate::types::FarmError;

/// Default request timeout for request/reply calls
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
    request_timeout: Duration,
}

impl NatsClient {
    pub async fn new(args: &NatsArgs, name: &str) -> Result<Self, FarmError> {
        info!("Connecting to NATS at {}", args.nats_url);

        // No retry on initial connect: dev mode falls back when NATS is absent
        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(Duration::from_secs(5));

        if let (Some(user), Some(pass)) = (&args.nats_user, &args.nats_password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(&args.nats_url)
            .await
            .map_err(|e| FarmError::Nats(format!("Failed to connect: {}", e)))?;

        info!("Connected to NATS at {}", args.nats_url);

        Ok(Self {
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Request/response pattern with timeout
    pub async fn request(&self, subject: &str, payload: Bytes) -> Result<Bytes, FarmError> {
        let message = tokio::time::timeout(
            self.request_timeout,
            self.client.request(subject.to_string(), payload),
        )
        .await
        .map_err(|_| FarmError::Nats(format!("Request to {} timed out", subject)))?
        .map_err(|e| FarmError::Nats(format!("Request failed: {}", e)))?;

        Ok(message.payload)
    }
}
