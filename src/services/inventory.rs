//! Inventory and fields

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::db::FarmStore;
use crate::domain::dto::{InventoryItemDto, InventoryResponse, UserFieldDto};
use crate::domain::{FieldPlanting, Plant, User};
use crate::types::{FarmError, Result};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn FarmStore>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn FarmStore>) -> Self {
        Self { store }
    }

    /// Full plant catalog with the user's balances, zero-filled
    pub async fn list(&self, user: &User) -> Result<InventoryResponse> {
        let balances = self.store.inventory(user.id).await?;
        let items = Plant::ALL
            .iter()
            .map(|plant| InventoryItemDto {
                plant: *plant,
                quantity: balances.get(plant).copied().unwrap_or(0),
            })
            .collect();
        Ok(InventoryResponse { items })
    }

    /// Planted fields ordered by slot
    pub async fn fields(&self, user: &User, now: DateTime<Utc>) -> Result<Vec<UserFieldDto>> {
        Ok(self
            .store
            .list_fields(user.id)
            .await?
            .iter()
            .map(|f| UserFieldDto::from_planting(f, now))
            .collect())
    }

    /// Plant one unit from inventory on an empty slot.
    ///
    /// `slot` and `plant` are the raw `fieldID` and `plant` query values.
    pub async fn plant(
        &self,
        user: &User,
        slot: Option<&str>,
        plant: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UserFieldDto> {
        let slot: i64 = slot
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| FarmError::DataNotFound("invalid field id".into()))?;
        let plant = plant
            .and_then(Plant::from_name)
            .ok_or_else(|| FarmError::InvalidRequest("plant not found".into()))?;

        let upgrade = self.store.farm_upgrade(user.id).await?;
        let slot = u32::try_from(slot)
            .ok()
            .filter(|s| *s < upgrade.max_fields())
            .ok_or_else(|| FarmError::InvalidRequest("field is not available".into()))?;

        if self.store.get_field(user.id, slot).await?.is_some() {
            return Err(FarmError::InvalidRequest("already planted".into()));
        }

        if !self.store.decrement_inventory(user.id, plant, 1).await? {
            return Err(FarmError::InvalidRequest("not enough items to plant".into()));
        }

        let planting = FieldPlanting {
            user_id: user.id,
            slot,
            plant,
            planted_at: now,
        };
        if !self.store.insert_field(&planting).await? {
            // Lost the slot to a concurrent request
            if let Err(e) = self.store.increment_inventory(user.id, plant, 1).await {
                error!("Refunding {} to {} failed: {}", plant, user.id, e);
            }
            return Err(FarmError::InvalidRequest("already planted".into()));
        }

        info!("User {} planted {} on slot {}", user.id, plant, slot);
        Ok(UserFieldDto::from_planting(&planting, now))
    }
}
