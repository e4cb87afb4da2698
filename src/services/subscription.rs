//! Channel subscription checks
//!
//! The check itself lives in the bot process. We ask over NATS request/reply
//! on `check_subscribe` with the payload `"{telegram_user_id},{channel_id}"`;
//! a reply of `1` means subscribed. Any failure counts as not subscribed.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::nats::NatsClient;

/// NATS subject answered by the bot
pub const CHECK_SUBSCRIBE_SUBJECT: &str = "check_subscribe";

#[async_trait]
pub trait SubscriptionCheck: Send + Sync {
    /// Whether the Telegram user is subscribed to the channel. Never fails.
    async fn is_subscribed(&self, external_user_id: &str, channel_id: &str) -> bool;
}

/// Asks the bot over NATS
pub struct NatsSubscriptionChecker {
    client: NatsClient,
}

impl NatsSubscriptionChecker {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionCheck for NatsSubscriptionChecker {
    async fn is_subscribed(&self, external_user_id: &str, channel_id: &str) -> bool {
        let payload = Bytes::from(format!("{},{}", external_user_id, channel_id));

        match self.client.request(CHECK_SUBSCRIBE_SUBJECT, payload).await {
            Ok(reply) => {
                let subscribed = reply.as_ref() == b"1";
                debug!(
                    "Subscription of {} to {}: {}",
                    external_user_id, channel_id, subscribed
                );
                subscribed
            }
            Err(e) => {
                warn!("Subscription check failed, treating as not subscribed: {}", e);
                false
            }
        }
    }
}

/// Used when NATS is unavailable. Nobody is subscribed.
pub struct DisabledSubscriptionChecker;

#[async_trait]
impl SubscriptionCheck for DisabledSubscriptionChecker {
    async fn is_subscribed(&self, external_user_id: &str, channel_id: &str) -> bool {
        debug!(
            "Subscription checks disabled; {} not subscribed to {}",
            external_user_id, channel_id
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_checker_never_subscribes() {
        let subscribed =
            tokio_test::block_on(DisabledSubscriptionChecker.is_subscribed("1", "@chan"));
        assert!(!subscribed);
    }
}
