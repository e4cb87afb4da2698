//! In-memory store
//!
//! Backs dev mode when MongoDB is unreachable, and the test suite. Each
//! atomic store operation runs under the DashMap entry lock of its key.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

use super::store::{ensure_credit, load_task, ClaimSwap, FarmStore, IdentityCreation};
use crate::domain::{
    AuthIdentity, FarmUpgrade, FieldPlanting, Plant, ProfileUpdate, Referral, Task,
    TaskDefinition, TaskStatus, User,
};
use crate::types::{FarmError, Result};

/// Identity key: (external id, method)
type IdentityKey = (String, String);

/// Concurrent in-memory game state
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    identities: DashMap<IdentityKey, AuthIdentity>,
    identity_keys: DashMap<Uuid, IdentityKey>,
    /// referred user -> (insertion sequence, edge)
    referrals: DashMap<Uuid, (u64, Referral)>,
    /// task id -> (insertion sequence, definition)
    tasks: DashMap<Uuid, (u64, TaskDefinition)>,
    progress: DashMap<(Uuid, Uuid), TaskStatus>,
    inventory: DashMap<(Uuid, Plant), i64>,
    fields: DashMap<(Uuid, u32), FieldPlanting>,
    upgrades: DashMap<Uuid, FarmUpgrade>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl FarmStore for MemoryStore {
    async fn find_identity(&self, external_id: &str, method: &str) -> Result<Option<AuthIdentity>> {
        let key = (external_id.to_string(), method.to_string());
        Ok(self.identities.get(&key).map(|e| e.value().clone()))
    }

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<AuthIdentity>> {
        let key = match self.identity_keys.get(&id) {
            Some(k) => k.value().clone(),
            None => return Ok(None),
        };
        Ok(self.identities.get(&key).map(|e| e.value().clone()))
    }

    async fn create_identity(&self, external_id: &str, method: &str) -> Result<IdentityCreation> {
        let key = (external_id.to_string(), method.to_string());

        match self.identities.entry(key.clone()) {
            Entry::Occupied(existing) => {
                debug!("Identity {}:{} already exists", method, external_id);
                Ok(IdentityCreation::Existing(existing.get().clone()))
            }
            Entry::Vacant(slot) => {
                let user = User::empty();
                let identity = AuthIdentity::new(user.id, external_id, method);
                self.users.insert(user.id, user);
                self.identity_keys.insert(identity.id, key);
                slot.insert(identity.clone());
                Ok(IdentityCreation::Created(identity))
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<User> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| FarmError::DataNotFound(format!("user {}", user_id)))?;
        user.apply(update);
        Ok(user.clone())
    }

    async fn insert_referral(&self, referral: Referral) -> Result<bool> {
        match self.referrals.entry(referral.referred_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert((self.next_sequence(), referral));
                Ok(true)
            }
        }
    }

    async fn count_referrals(&self, referrer_id: Uuid) -> Result<u64> {
        Ok(self
            .referrals
            .iter()
            .filter(|e| e.value().1.referrer_id == referrer_id)
            .count() as u64)
    }

    async fn list_referred_users(&self, referrer_id: Uuid) -> Result<Vec<User>> {
        let mut edges: Vec<(u64, Uuid)> = self
            .referrals
            .iter()
            .filter(|e| e.value().1.referrer_id == referrer_id)
            .map(|e| (e.value().0, e.value().1.referred_id))
            .collect();
        edges.sort();

        Ok(edges
            .into_iter()
            .filter_map(|(_, id)| self.users.get(&id).map(|u| u.value().clone()))
            .collect())
    }

    async fn upsert_task(&self, definition: &TaskDefinition) -> Result<Uuid> {
        let id = match definition.id {
            Some(id) => id,
            None => self
                .tasks
                .iter()
                .find(|e| e.value().1.name == definition.name)
                .map(|e| *e.key())
                .unwrap_or_else(Uuid::new_v4),
        };

        let mut stored = definition.clone();
        stored.id = Some(id);

        match self.tasks.entry(id) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().1 = stored;
            }
            Entry::Vacant(slot) => {
                slot.insert((self.next_sequence(), stored));
            }
        }
        Ok(id)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut definitions: Vec<(u64, TaskDefinition)> =
            self.tasks.iter().map(|e| e.value().clone()).collect();
        definitions.sort_by_key(|(seq, _)| *seq);

        Ok(definitions
            .iter()
            .filter_map(|(_, def)| load_task(def))
            .collect())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.get(&id).and_then(|e| load_task(&e.value().1)))
    }

    async fn task_status(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus> {
        Ok(self
            .progress
            .get(&(user_id, task_id))
            .map(|s| *s.value())
            .unwrap_or_default())
    }

    async fn task_statuses(&self, user_id: Uuid) -> Result<HashMap<Uuid, TaskStatus>> {
        Ok(self
            .progress
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| (e.key().1, *e.value()))
            .collect())
    }

    async fn mark_task_done(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus> {
        let status = self
            .progress
            .entry((user_id, task_id))
            .or_insert(TaskStatus::Done);
        Ok(*status.value())
    }

    async fn try_claim_task(&self, user_id: Uuid, task_id: Uuid) -> Result<ClaimSwap> {
        match self.progress.entry((user_id, task_id)) {
            Entry::Occupied(mut current) => {
                let previous = *current.get();
                if previous.is_claimed() {
                    return Ok(ClaimSwap::AlreadyClaimed);
                }
                current.insert(TaskStatus::Claimed);
                Ok(ClaimSwap::Won { previous })
            }
            Entry::Vacant(slot) => {
                slot.insert(TaskStatus::Claimed);
                Ok(ClaimSwap::Won {
                    previous: TaskStatus::None,
                })
            }
        }
    }

    async fn revert_claim(&self, user_id: Uuid, task_id: Uuid, previous: TaskStatus) -> Result<()> {
        let key = (user_id, task_id);
        match previous {
            TaskStatus::None => {
                self.progress
                    .remove_if(&key, |_, status| status.is_claimed());
            }
            other => {
                if let Some(mut status) = self.progress.get_mut(&key) {
                    *status = other;
                }
            }
        }
        Ok(())
    }

    async fn inventory_quantity(&self, user_id: Uuid, plant: Plant) -> Result<i64> {
        Ok(self
            .inventory
            .get(&(user_id, plant))
            .map(|q| *q.value())
            .unwrap_or(0))
    }

    async fn inventory(&self, user_id: Uuid) -> Result<HashMap<Plant, i64>> {
        Ok(self
            .inventory
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| (e.key().1, *e.value()))
            .collect())
    }

    async fn increment_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<i64> {
        ensure_credit(plant, amount)?;
        let mut quantity = self.inventory.entry((user_id, plant)).or_insert(0);
        let updated = quantity.checked_add(amount).ok_or_else(|| {
            FarmError::Internal(format!("Inventory balance for {} would overflow", plant))
        })?;
        *quantity = updated;
        Ok(updated)
    }

    async fn decrement_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<bool> {
        match self.inventory.get_mut(&(user_id, plant)) {
            Some(mut quantity) if *quantity >= amount => {
                *quantity -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_fields(&self, user_id: Uuid) -> Result<Vec<FieldPlanting>> {
        let mut fields: Vec<FieldPlanting> = self
            .fields
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        fields.sort_by_key(|f| f.slot);
        Ok(fields)
    }

    async fn get_field(&self, user_id: Uuid, slot: u32) -> Result<Option<FieldPlanting>> {
        Ok(self.fields.get(&(user_id, slot)).map(|f| f.value().clone()))
    }

    async fn insert_field(&self, planting: &FieldPlanting) -> Result<bool> {
        match self.fields.entry((planting.user_id, planting.slot)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(planting.clone());
                Ok(true)
            }
        }
    }

    async fn farm_upgrade(&self, user_id: Uuid) -> Result<FarmUpgrade> {
        Ok(*self
            .upgrades
            .entry(user_id)
            .or_insert_with(|| FarmUpgrade::initial(user_id))
            .value())
    }
}
