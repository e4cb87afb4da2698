//! Store double that wraps `MemoryStore` and fails chosen writes on demand

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crazyfarm::db::{ClaimSwap, FarmStore, IdentityCreation, MemoryStore};
use crazyfarm::domain::{
    AuthIdentity, FarmUpgrade, FieldPlanting, Plant, ProfileUpdate, Referral, Task,
    TaskDefinition, TaskStatus, User,
};
use crazyfarm::{FarmError, Result};

#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// `increment_inventory` fails without writing
    pub fail_credit: AtomicBool,
    /// `insert_field` reports the slot as taken without writing
    pub steal_slot: AtomicBool,
    /// `update_profile` fails without writing
    pub fail_profile: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    fn tripped(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FarmStore for FlakyStore {
    async fn find_identity(&self, external_id: &str, method: &str) -> Result<Option<AuthIdentity>> {
        self.inner.find_identity(external_id, method).await
    }

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<AuthIdentity>> {
        self.inner.find_identity_by_id(id).await
    }

    async fn create_identity(&self, external_id: &str, method: &str) -> Result<IdentityCreation> {
        self.inner.create_identity(external_id, method).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<User> {
        if Self::tripped(&self.fail_profile) {
            return Err(FarmError::Database("profile write refused".into()));
        }
        self.inner.update_profile(user_id, update).await
    }

    async fn insert_referral(&self, referral: Referral) -> Result<bool> {
        self.inner.insert_referral(referral).await
    }

    async fn count_referrals(&self, referrer_id: Uuid) -> Result<u64> {
        self.inner.count_referrals(referrer_id).await
    }

    async fn list_referred_users(&self, referrer_id: Uuid) -> Result<Vec<User>> {
        self.inner.list_referred_users(referrer_id).await
    }

    async fn upsert_task(&self, definition: &TaskDefinition) -> Result<Uuid> {
        self.inner.upsert_task(definition).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.inner.list_tasks().await
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        self.inner.get_task(id).await
    }

    async fn task_status(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus> {
        self.inner.task_status(user_id, task_id).await
    }

    async fn task_statuses(&self, user_id: Uuid) -> Result<HashMap<Uuid, TaskStatus>> {
        self.inner.task_statuses(user_id).await
    }

    async fn mark_task_done(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus> {
        self.inner.mark_task_done(user_id, task_id).await
    }

    async fn try_claim_task(&self, user_id: Uuid, task_id: Uuid) -> Result<ClaimSwap> {
        self.inner.try_claim_task(user_id, task_id).await
    }

    async fn revert_claim(&self, user_id: Uuid, task_id: Uuid, previous: TaskStatus) -> Result<()> {
        self.inner.revert_claim(user_id, task_id, previous).await
    }

    async fn inventory_quantity(&self, user_id: Uuid, plant: Plant) -> Result<i64> {
        self.inner.inventory_quantity(user_id, plant).await
    }

    async fn inventory(&self, user_id: Uuid) -> Result<HashMap<Plant, i64>> {
        self.inner.inventory(user_id).await
    }

    async fn increment_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<i64> {
        if Self::tripped(&self.fail_credit) {
            return Err(FarmError::Database("inventory write refused".into()));
        }
        self.inner.increment_inventory(user_id, plant, amount).await
    }

    async fn decrement_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<bool> {
        self.inner.decrement_inventory(user_id, plant, amount).await
    }

    async fn list_fields(&self, user_id: Uuid) -> Result<Vec<FieldPlanting>> {
        self.inner.list_fields(user_id).await
    }

    async fn get_field(&self, user_id: Uuid, slot: u32) -> Result<Option<FieldPlanting>> {
        self.inner.get_field(user_id, slot).await
    }

    async fn insert_field(&self, planting: &FieldPlanting) -> Result<bool> {
        if Self::tripped(&self.steal_slot) {
            return Ok(false);
        }
        self.inner.insert_field(planting).await
    }

    async fn farm_upgrade(&self, user_id: Uuid) -> Result<FarmUpgrade> {
        self.inner.farm_upgrade(user_id).await
    }
}
