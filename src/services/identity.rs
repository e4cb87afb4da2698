//! Identity resolution
//!
//! Maps an external identity onto a user, creating both on first sight, and
//! attributes referrals for newly created users.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::FarmStore;
use crate::domain::{AuthIdentity, Referral};
use crate::telegram::StartParam;
use crate::types::Result;

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn FarmStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn FarmStore>) -> Self {
        Self { store }
    }

    /// Look up the identity, creating it and an empty user if absent.
    /// The flag is true when this call created them.
    pub async fn get_or_create(&self, external_id: &str, method: &str) -> Result<(AuthIdentity, bool)> {
        if let Some(identity) = self.store.find_identity(external_id, method).await? {
            return Ok((identity, false));
        }

        let outcome = self.store.create_identity(external_id, method).await?;
        let created = outcome.is_created();
        if created {
            info!("Created user {} for {} identity", outcome.identity().user_id, method);
        }
        Ok((outcome.identity().clone(), created))
    }

    /// Record the referral carried in a start parameter, if any.
    ///
    /// Malformed parameters, unknown referrers and store failures are logged
    /// and swallowed; returns whether an edge was recorded.
    pub async fn attribute_referral(&self, new_user_id: Uuid, start_param: &str) -> bool {
        let referrer_id = match StartParam::decode(start_param).referrer_id() {
            Some(id) => id,
            None => {
                if !start_param.is_empty() {
                    debug!("Start parameter carries no referral");
                }
                return false;
            }
        };

        if referrer_id == new_user_id {
            debug!("Ignoring self-referral of {}", new_user_id);
            return false;
        }

        match self.store.get_user(referrer_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("Referrer {} does not exist", referrer_id);
                return false;
            }
            Err(e) => {
                warn!("Referrer lookup failed: {}", e);
                return false;
            }
        }

        let referral = Referral {
            referrer_id,
            referred_id: new_user_id,
        };
        match self.store.insert_referral(referral).await {
            Ok(true) => {
                info!("User {} referred by {}", new_user_id, referrer_id);
                true
            }
            Ok(false) => {
                debug!("User {} already has a referrer", new_user_id);
                false
            }
            Err(e) => {
                warn!("Recording referral failed: {}", e);
                false
            }
        }
    }
}
