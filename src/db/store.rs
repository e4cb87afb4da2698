//! Persistence interface for the game
//!
//! Every operation that has to be atomic under concurrent requests is a
//! single store call, so each backend can serialize it its own way.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    AuthIdentity, FarmUpgrade, FieldPlanting, Plant, ProfileUpdate, Referral, Task,
    TaskDefinition, TaskStatus, User,
};
use crate::types::{FarmError, Result};

/// Result of racing to create an auth identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCreation {
    /// This caller created the identity and its user
    Created(AuthIdentity),
    /// Another writer got there first; its identity is returned
    Existing(AuthIdentity),
}

impl IdentityCreation {
    pub fn identity(&self) -> &AuthIdentity {
        match self {
            Self::Created(identity) | Self::Existing(identity) => identity,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Result of the compare-and-swap into `TaskStatus::Claimed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimSwap {
    /// This caller moved the task to claimed from `previous`
    Won { previous: TaskStatus },
    /// The task was already claimed
    AlreadyClaimed,
}

#[async_trait]
pub trait FarmStore: Send + Sync {
    // Identities and users

    async fn find_identity(&self, external_id: &str, method: &str) -> Result<Option<AuthIdentity>>;

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<AuthIdentity>>;

    /// Create an empty user and an identity linked to it. At most one
    /// identity exists per `(external_id, method)`; a losing writer discards
    /// its user and gets the winner's identity back.
    async fn create_identity(&self, external_id: &str, method: &str) -> Result<IdentityCreation>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<User>;

    // Referrals

    /// Record a referral edge. Returns false if the referred user already has one.
    async fn insert_referral(&self, referral: Referral) -> Result<bool>;

    async fn count_referrals(&self, referrer_id: Uuid) -> Result<u64>;

    /// Users invited by `referrer_id`, oldest first
    async fn list_referred_users(&self, referrer_id: Uuid) -> Result<Vec<User>>;

    // Task catalog

    /// Insert or replace a task, returning its id
    async fn upsert_task(&self, definition: &TaskDefinition) -> Result<Uuid>;

    /// Every loadable task. Definitions that fail to decode are skipped.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;

    // Task progress

    async fn task_status(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus>;

    /// Status of every task the user has progress on
    async fn task_statuses(&self, user_id: Uuid) -> Result<HashMap<Uuid, TaskStatus>>;

    /// Insert `Done` if no progress exists. Never overwrites; returns the
    /// status now stored.
    async fn mark_task_done(&self, user_id: Uuid, task_id: Uuid) -> Result<TaskStatus>;

    /// Move progress to `Claimed` unless it already is
    async fn try_claim_task(&self, user_id: Uuid, task_id: Uuid) -> Result<ClaimSwap>;

    /// Undo a won swap, restoring `previous`
    async fn revert_claim(&self, user_id: Uuid, task_id: Uuid, previous: TaskStatus) -> Result<()>;

    // Inventory

    async fn inventory_quantity(&self, user_id: Uuid, plant: Plant) -> Result<i64>;

    /// Balances the user has a record for
    async fn inventory(&self, user_id: Uuid) -> Result<HashMap<Plant, i64>>;

    /// Atomically add `amount` units; returns the new balance.
    /// Fails without writing unless `amount` is positive.
    async fn increment_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<i64>;

    /// Atomically remove `amount` units if the balance covers it.
    /// Returns false, changing nothing, when it does not.
    async fn decrement_inventory(&self, user_id: Uuid, plant: Plant, amount: i64) -> Result<bool>;

    // Fields

    /// Plantings ordered by slot
    async fn list_fields(&self, user_id: Uuid) -> Result<Vec<FieldPlanting>>;

    async fn get_field(&self, user_id: Uuid, slot: u32) -> Result<Option<FieldPlanting>>;

    /// Returns false if the slot is already occupied
    async fn insert_field(&self, planting: &FieldPlanting) -> Result<bool>;

    // Upgrades

    /// Farm level, created at level 1 on first access
    async fn farm_upgrade(&self, user_id: Uuid) -> Result<FarmUpgrade>;
}

/// Decode a stored definition, skipping it with a warning if it cannot load
pub(crate) fn load_task(definition: &TaskDefinition) -> Option<Task> {
    match Task::from_definition(definition) {
        Ok(task) => Some(task),
        Err(e) => {
            tracing::warn!("Skipping task: {}", e);
            None
        }
    }
}

/// Inventory credits only ever add units
pub(crate) fn ensure_credit(plant: Plant, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(FarmError::Internal(format!(
            "Inventory credit for {} must be positive, got {}",
            plant, amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_credit() {
        assert!(ensure_credit(Plant::Rose, 1).is_ok());
        assert!(matches!(
            ensure_credit(Plant::Rose, 0),
            Err(FarmError::Internal(_))
        ));
        assert!(matches!(
            ensure_credit(Plant::Rose, -10),
            Err(FarmError::Internal(_))
        ));
    }
}
