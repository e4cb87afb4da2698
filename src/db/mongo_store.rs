//! MongoDB-backed store
//!
//! Uniqueness and compare-and-swap guarantees come from unique indexes plus
//! single-document atomic updates; no multi-document transactions are used.

use async_trait::async_trait;
use bson::{doc, DateTime};
use mongodb::options::ReturnDocument;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::mongo::{MongoClient, MongoCollection, Unique};
use super::schemas::{
    AuthIdentityDoc, FieldDoc, InventoryDoc, Metadata, ReferralDoc, TaskDoc, TaskProgressDoc,
    UpgradeDoc, UserDoc, AUTH_IDENTITY_COLLECTION, FIELD_COLLECTION, INVENTORY_COLLECTION,
    REFERRAL_COLLECTION, TASK_COLLECTION, TASK_PROGRESS_COLLECTION, UPGRADE_COLLECTION,
    USER_COLLECTION,
};
use super::store::{ensure_credit, load_task, ClaimSwap, FarmStore, IdentityCreation};
use crate::domain::{
    AuthIdentity, FarmUpgrade, FieldPlanting, Plant, ProfileUpdate, Referral, Task,
    TaskDefinition, TaskStatus, User, MAX_FARM_LEVEL,
};
use crate::types::{FarmError, Result};

/// Game state in MongoDB
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    identities: MongoCollection<AuthIdentityDoc>,
    referrals: MongoCollection<ReferralDoc>,
    tasks: MongoCollection<TaskDoc>,
    progress: MongoCollection<TaskProgressDoc>,
    inventory: MongoCollection<InventoryDoc>,
    fields: MongoCollection<FieldDoc>,
    upgrades: MongoCollection<UpgradeDoc>,
}

impl MongoStore {
    /// Open every collection and make sure its indexes exist
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            identities: client.collection(AUTH_IDENTITY_COLLECTION).await?,
            referrals: client.collection(REFERRAL_COLLECTION).await?,
            tasks: client.collection(TASK_COLLECTION).await?,
            progress: client.collection(TASK_PROGRESS_COLLECTION).await?,
            inventory: client.collection(INVENTORY_COLLECTION).await?,
            fields: client.collection(FIELD_COLLECTION).await?,
            upgrades: client.collection(UPGRADE_COLLECTION).await?,
        })
    }
}

fn corrupt(what: &str, id: impl std::fmt::Display) -> FarmError {
    FarmError::Database(format!("Stored {} {} is unreadable", what, id))
}

#[async_trait]
impl FarmStore for MongoStore {
    async fn find_identity(&self, external_id: &str, method: &str) -> Result<Option<AuthIdentity>> {
        match self
            .identities
            .find_one(doc! { "external_id": external_id, "method": method })
            .await?
        {
            Some(d) => d
                .into_identity()
                .map(Some)
                .ok_or_else(|| corrupt("identity", format!("{}:{}", method, external_id))),
            None => Ok(None),
        }
    }

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<AuthIdentity>> {
        let found = self
            .identities
            .find_one(doc! { "id": id.to_string() })
            .await?;
        Ok(found.and_then(AuthIdentityDoc::into_identity))
    }

    async fn create_identity(&self, external_id: &str, method: &str) -> Result<IdentityCreation> {
        let user = User::empty();
        self.users.insert_one(UserDoc::from(&user)).await?;

        let identity = AuthIdentity::new(user.id, external_id, method);
        match self
            .identities
            .insert_unique(AuthIdentityDoc::from(&identity))
            .await?
        {
            Unique::Written(()) => Ok(IdentityCreation::Created(identity)),
            Unique::Duplicate => {
                debug!(
                    "Lost identity creation race for {}:{}, discarding user {}",
                    method, external_id, user.id
                );
                self.users
                    .soft_delete(doc! { "id": user.id.to_string() })
                    .await?;
                let winner = self.find_identity(external_id, method).await?.ok_or_else(|| {
                    FarmError::Database(format!(
                        "Identity {}:{} conflicted but cannot be read",
                        method, external_id
                    ))
                })?;
                Ok(IdentityCreation::Existing(winner))
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let found = self.users.find_one(doc! { "id": id.to_string() }).await?;
        Ok(found.and_then(UserDoc::into_user))
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<User> {
        let updated = self
            .users
            .find_one_and_update(
                doc! { "id": user_id.to_string() },
                doc! {
                    "$set": {
                        "tg_id": update.tg_id,
                        "first_name": update.first_name.clone(),
                        "last_name": update.last_name.clone(),
                        "username": update.username.clone(),
                        "icon": update.icon.clone(),
                        "language_code": update.language_code.clone(),
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?
            .ok_or_else(|| FarmError::DataNotFound(format!("user {}", user_id)))?;

        updated.into_user().ok_or_else(|| corrupt("user", user_id))
    }

    async fn insert_referral(&self, referral: Referral) -> Result<bool> {
        Ok(matches!(
            self.referrals
                .insert_unique(ReferralDoc::from(referral))
                .await?,
            Unique::Written(())
        ))
    }

    async fn count_referrals(&self, referrer_id: Uuid) -> Result<u64> {
        self.referrals
            .count(doc! { "referrer_id": referrer_id.to_string() })
            .await
    }

    async fn list_referred_users(&self, referrer_id: Uuid) -> Result<Vec<User>> {
        let edges = self
            .referrals
            .find_many(doc! { "referrer_id": referrer_id.to_string() })
            .await?;
        let ids: Vec<String> = edges.into_iter().map(|e| e.referred_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<String, User> = self
            .users
            .find_many(doc! { "id": { "$in": ids.clone() } })
            .await?
            .into_iter()
            .filter_map(|d| {
                let id = d.id.clone();
                d.into_user().map(|u| (id, u))
            })
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn upsert_task(&self, definition: &TaskDefinition) -> Result<Uuid> {
        let id = match definition.id {
            Some(id) => id,
            None => self
                .tasks
                .find_one(doc! { "name": definition.name.as_str() })
                .await?
                .and_then(|d| Uuid::parse_str(&d.id).ok())
                .unwrap_or_else(Uuid::new_v4),
        };

        let task = TaskDoc::new(id, definition);
        let update = doc! {
            "$set": {
                "name": task.name.as_str(),
                "icon": task.icon.clone(),
                "type": task.task_type.as_str(),
                "reward": task.reward.as_str(),
                "reward_amount": task.reward_amount,
                "need_done_times": task.need_done_times,
                "data": bson::to_bson(&task.data)?,
                "metadata.updated_at": DateTime::now(),
            },
            "$setOnInsert": Metadata::on_insert(),
        };

        match self
            .tasks
            .upsert_one(doc! { "id": id.to_string() }, update)
            .await?
        {
            Unique::Written(_) => Ok(id),
            Unique::Duplicate => Err(FarmError::Database(format!(
                "Concurrent upsert of task {}",
                id
            ))),
        }
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .find_many(doc! {})
            .await?
            .into_iter()
            .filter_map(|d| load_task(&d.into_definition()))
            .collect())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let found = self.tasks.find_one(doc! { "id": id.to_string() }).await?;
        Ok(found.and_then(|d| load_task(&d.into_definition())))
    }

    async fn task_status(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus> {
        let found = self
            .progress
            .find_one(doc! { "user_id": user_id.to_string(), "task_id": task_id.to_string() })
            .await?;
        Ok(found.map(|d| d.status).unwrap_or_default())
    }

    async fn task_statuses(&self, user_id: Uuid) -> Result<HashMap<Uuid, TaskStatus>> {
        Ok(self
            .progress
            .find_many(doc! { "user_id": user_id.to_string() })
            .await?
            .into_iter()
            .filter_map(|d| Uuid::parse_str(&d.task_id).ok().map(|id| (id, d.status)))
            .collect())
    }

    async fn mark_task_done(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus> {
        let mut on_insert = Metadata::on_insert();
        on_insert.insert("metadata.updated_at", DateTime::now());
        on_insert.insert("status", TaskStatus::Done.as_str());

        // Duplicate means a concurrent writer inserted first; either way the
        // stored status is authoritative
        self.progress
            .upsert_one(
                doc! { "user_id": user_id.to_string(), "task_id": task_id.to_string() },
                doc! { "$setOnInsert": on_insert },
            )
            .await?;

        self.task_status(user_id, task_id).await
    }

    async fn try_claim_task(&self, user_id: Uuid, task_id: Uuid) -> Result<ClaimSwap> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "task_id": task_id.to_string(),
            "status": { "$ne": TaskStatus::Claimed.as_str() },
        };
        let update = doc! {
            "$set": {
                "status": TaskStatus::Claimed.as_str(),
                "metadata.updated_at": DateTime::now(),
            },
            "$setOnInsert": Metadata::on_insert(),
        };

        match self
            .progress
            .find_one_and_upsert(filter, update, ReturnDocument::Before)
            .await?
        {
            Unique::Written(Some(before)) => Ok(ClaimSwap::Won {
                previous: before.status,
            }),
            Unique::Written(None) => Ok(ClaimSwap::Won {
                previous: TaskStatus::None,
            }),
            // The only document that can block the upsert is a claimed one
            Unique::Duplicate => Ok(ClaimSwap::AlreadyClaimed),
        }
    }

    async fn revert_claim(&self, user_id: Uuid, task_id: Uuid, previous: TaskStatus) -> Result<()> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "task_id": task_id.to_string(),
            "status": TaskStatus::Claimed.as_str(),
        };

        match previous {
            TaskStatus::None => {
                self.progress.delete_one(filter).await?;
            }
            other => {
                self.progress
                    .update_one(
                        filter,
                        doc! { "$set": {
                            "status": other.as_str(),
                            "metadata.updated_at": DateTime::now(),
                        } },
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn inventory_quantity(&self, user_id: Uuid, plant: Plant) -> Result<i64> {
        let found = self
            .inventory
            .find_one(doc! { "user_id": user_id.to_string(), "plant": plant.as_str() })
            .await?;
        Ok(found.map(|d| d.quantity).unwrap_or(0))
    }

    async fn inventory(&self, user_id: Uuid) -> Result<HashMap<Plant, i64>> {
        Ok(self
            .inventory
            .find_many(doc! { "user_id": user_id.to_string() })
            .await?
            .into_iter()
            .map(|d| (d.plant, d.quantity))
            .collect())
    }

    async fn increment_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<i64> {
        ensure_credit(plant, amount)?;
        let update = doc! {
            "$inc": { "quantity": amount },
            "$set": { "metadata.updated_at": DateTime::now() },
            "$setOnInsert": Metadata::on_insert(),
        };

        match self
            .inventory
            .find_one_and_upsert(
                doc! { "user_id": user_id.to_string(), "plant": plant.as_str() },
                update,
                ReturnDocument::After,
            )
            .await?
        {
            Unique::Written(Some(d)) => Ok(d.quantity),
            Unique::Written(None) => Err(FarmError::Database(format!(
                "Inventory upsert for {} returned nothing",
                plant
            ))),
            Unique::Duplicate => Err(FarmError::Database(format!(
                "Concurrent inventory insert for {}",
                plant
            ))),
        }
    }

    async fn decrement_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<bool> {
        let result = self
            .inventory
            .update_one(
                doc! {
                    "user_id": user_id.to_string(),
                    "plant": plant.as_str(),
                    "quantity": { "$gte": amount },
                },
                doc! {
                    "$inc": { "quantity": -amount },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn list_fields(&self, user_id: Uuid) -> Result<Vec<FieldPlanting>> {
        Ok(self
            .fields
            .find_many_sorted(doc! { "user_id": user_id.to_string() }, doc! { "slot": 1 })
            .await?
            .into_iter()
            .filter_map(FieldDoc::into_planting)
            .collect())
    }

    async fn get_field(&self, user_id: Uuid, slot: u32) -> Result<Option<FieldPlanting>> {
        let found = self
            .fields
            .find_one(doc! { "user_id": user_id.to_string(), "slot": i64::from(slot) })
            .await?;
        Ok(found.and_then(FieldDoc::into_planting))
    }

    async fn insert_field(&self, planting: &FieldPlanting) -> Result<bool> {
        Ok(matches!(
            self.fields.insert_unique(FieldDoc::from(planting)).await?,
            Unique::Written(())
        ))
    }

    async fn farm_upgrade(&self, user_id: Uuid) -> Result<FarmUpgrade> {
        let mut on_insert = Metadata::on_insert();
        on_insert.insert("metadata.updated_at", DateTime::now());
        on_insert.insert("farm_lvl", 1_i32);

        let filter = doc! { "user_id": user_id.to_string() };
        let stored = match self
            .upgrades
            .find_one_and_upsert(
                filter.clone(),
                doc! { "$setOnInsert": on_insert },
                ReturnDocument::After,
            )
            .await?
        {
            Unique::Written(Some(d)) => Some(d),
            Unique::Written(None) | Unique::Duplicate => self.upgrades.find_one(filter).await?,
        };

        let level = match stored {
            Some(d) => u8::try_from(d.farm_lvl.clamp(1, i32::from(MAX_FARM_LEVEL))).unwrap_or(1),
            None => {
                warn!("Farm upgrade for {} missing after upsert", user_id);
                1
            }
        };
        Ok(FarmUpgrade { user_id, level })
    }
}
