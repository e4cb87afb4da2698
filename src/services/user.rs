//! Profile, farm level and referrals of the calling user

use std::sync::Arc;

use crate::db::FarmStore;
use crate::domain::dto::{UserDto, UserReferralDto, UserUpgradeDto};
use crate::domain::User;
use crate::types::Result;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn FarmStore>,
    bot_link: String,
}

impl UserService {
    pub fn new(store: Arc<dyn FarmStore>, bot_link: impl Into<String>) -> Self {
        Self {
            store,
            bot_link: bot_link.into(),
        }
    }

    pub fn me(&self, user: &User) -> UserDto {
        UserDto::from_user(user, &self.bot_link)
    }

    pub async fn upgrade(&self, user: &User) -> Result<UserUpgradeDto> {
        Ok(self.store.farm_upgrade(user.id).await?.into())
    }

    pub async fn referrals(&self, user: &User) -> Result<Vec<UserReferralDto>> {
        Ok(self
            .store
            .list_referred_users(user.id)
            .await?
            .iter()
            .map(UserReferralDto::from)
            .collect())
    }
}
