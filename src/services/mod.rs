//! Game services
//!
//! Each service owns a handle to the store and implements one group of
//! operations. `Services` bundles them for the HTTP layer.

pub mod auth;
pub mod catalog;
pub mod identity;
pub mod inventory;
pub mod progression;
pub mod subscription;
pub mod user;

use std::sync::Arc;

pub use auth::{AuthContext, AuthService};
pub use catalog::{load_catalog, parse_catalog, seed_catalog};
pub use identity::IdentityResolver;
pub use inventory::InventoryService;
pub use progression::ProgressionEngine;
pub use subscription::{
    DisabledSubscriptionChecker, NatsSubscriptionChecker, SubscriptionCheck,
    CHECK_SUBSCRIBE_SUBJECT,
};
pub use user::UserService;

use crate::auth::SessionIssuer;
use crate::config::AuthConfig;
use crate::db::FarmStore;

#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub inventory: InventoryService,
    pub progression: ProgressionEngine,
}

impl Services {
    pub fn new(
        store: Arc<dyn FarmStore>,
        subscriptions: Arc<dyn SubscriptionCheck>,
        issuer: SessionIssuer,
        config: AuthConfig,
    ) -> Self {
        let users = UserService::new(store.clone(), config.bot_link.clone());
        Self {
            auth: AuthService::new(store.clone(), issuer, config),
            users,
            inventory: InventoryService::new(store.clone()),
            progression: ProgressionEngine::new(store, subscriptions),
        }
    }
}
