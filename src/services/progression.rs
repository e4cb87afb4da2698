//! Task progression
//!
//! Per user and task: NONE -> DONE -> CLAIMED. `check` records that the
//! criteria are met, `claim` pays the reward. The reward is credited only by
//! the caller that wins the store's compare-and-swap into CLAIMED.

use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::subscription::SubscriptionCheck;
use crate::db::{ClaimSwap, FarmStore};
use crate::domain::dto::TaskDto;
use crate::domain::{Task, TaskKind, TaskStatus, User};
use crate::types::{FarmError, Result};

#[derive(Clone)]
pub struct ProgressionEngine {
    store: Arc<dyn FarmStore>,
    subscriptions: Arc<dyn SubscriptionCheck>,
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn FarmStore>, subscriptions: Arc<dyn SubscriptionCheck>) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    /// Parse a `taskId` query value
    pub fn parse_task_id(raw: Option<&str>) -> Result<Uuid> {
        let raw = match raw {
            Some(r) if !r.is_empty() => r,
            _ => return Err(FarmError::WrongBody("taskId is required".into())),
        };
        Uuid::parse_str(raw).map_err(|_| FarmError::InvalidRequest("invalid task id".into()))
    }

    async fn load_task(&self, task_id: Uuid) -> Result<Task> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| FarmError::InvalidRequest("task not found".into()))
    }

    /// Every catalog task with the user's status
    pub async fn list_tasks(&self, user: &User) -> Result<Vec<TaskDto>> {
        let tasks = self.store.list_tasks().await?;
        let statuses = self.store.task_statuses(user.id).await?;

        Ok(tasks
            .iter()
            .map(|task| {
                let status = statuses.get(&task.id).copied().unwrap_or_default();
                TaskDto::new(task, status)
            })
            .collect())
    }

    /// Whether the task's completion criteria hold right now
    pub async fn criteria_met(&self, user: &User, task: &Task) -> Result<bool> {
        let required = task.need_done_times;
        match &task.kind {
            TaskKind::Subscribe { channel_id } => Ok(self
                .subscriptions
                .is_subscribed(&user.tg_id.to_string(), channel_id)
                .await),
            TaskKind::Friends => {
                let count = self.store.count_referrals(user.id).await?;
                Ok(i64::try_from(count).unwrap_or(i64::MAX) >= required)
            }
            TaskKind::Inventory { plant } => {
                let quantity = self.store.inventory_quantity(user.id, *plant).await?;
                Ok(quantity >= required)
            }
            TaskKind::Unrecognized { tag } => {
                debug!("Task {} has unrecognized type '{}'", task.id, tag);
                Ok(false)
            }
        }
    }

    /// Record completion if the criteria are met.
    ///
    /// A task already DONE or CLAIMED is returned as-is without evaluating
    /// criteria.
    pub async fn check(&self, user: &User, task_id: Uuid) -> Result<TaskDto> {
        let task = self.load_task(task_id).await?;
        let current = self.store.task_status(user.id, task.id).await?;
        if current != TaskStatus::None {
            return Ok(TaskDto::new(&task, current));
        }

        if !self.criteria_met(user, &task).await? {
            return Ok(TaskDto::new(&task, TaskStatus::None));
        }

        let status = self.store.mark_task_done(user.id, task.id).await?;
        debug!("Task {} for user {} is {}", task.id, user.id, status.as_str());
        Ok(TaskDto::new(&task, status))
    }

    /// Claim the reward if the criteria are met. Pays at most once.
    pub async fn claim(&self, user: &User, task_id: Uuid) -> Result<TaskDto> {
        let task = self.load_task(task_id).await?;
        let current = self.store.task_status(user.id, task.id).await?;
        if current.is_claimed() {
            return Ok(TaskDto::new(&task, current));
        }

        // Evaluated afresh; a prior DONE is not trusted
        if !self.criteria_met(user, &task).await? {
            return Ok(TaskDto::new(&task, current));
        }

        let previous = match self.store.try_claim_task(user.id, task.id).await? {
            ClaimSwap::Won { previous } => previous,
            ClaimSwap::AlreadyClaimed => {
                debug!("Task {} for user {} claimed concurrently", task.id, user.id);
                return Ok(TaskDto::new(&task, TaskStatus::Claimed));
            }
        };

        if let Err(e) = self
            .store
            .increment_inventory(user.id, task.reward, task.reward_amount)
            .await
        {
            error!(
                "Crediting reward for task {} to {} failed, reverting claim: {}",
                task.id, user.id, e
            );
            if let Err(revert) = self.store.revert_claim(user.id, task.id, previous).await {
                error!("Reverting claim of task {} for {} failed: {}", task.id, user.id, revert);
            }
            return Err(e);
        }

        info!(
            "User {} claimed task {}: {} x{}",
            user.id, task.id, task.reward, task.reward_amount
        );
        Ok(TaskDto::new(&task, TaskStatus::Claimed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::{Plant, TaskDefinition};
    use crate::services::subscription::DisabledSubscriptionChecker;
    use serde_json::json;

    async fn setup(task_type: &str, data: serde_json::Value) -> (ProgressionEngine, Arc<MemoryStore>, User, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let created = store.create_identity("1", "telegram").await.unwrap();
        let user = store.get_user(created.identity().user_id).await.unwrap().unwrap();

        let task_id = store
            .upsert_task(&TaskDefinition {
                id: Some(Uuid::new_v4()),
                name: "task".into(),
                icon: None,
                task_type: task_type.into(),
                reward: "MONEY".into(),
                reward_amount: 10,
                need_done_times: 2,
                data: data.as_object().cloned().unwrap_or_default(),
            })
            .await
            .unwrap();

        let engine = ProgressionEngine::new(store.clone(), Arc::new(DisabledSubscriptionChecker));
        (engine, store, user, task_id)
    }

    #[test]
    fn test_parse_task_id() {
        assert!(matches!(
            ProgressionEngine::parse_task_id(None),
            Err(FarmError::WrongBody(_))
        ));
        assert!(matches!(
            ProgressionEngine::parse_task_id(Some("")),
            Err(FarmError::WrongBody(_))
        ));
        assert!(matches!(
            ProgressionEngine::parse_task_id(Some("nope")),
            Err(FarmError::InvalidRequest(_))
        ));
        let id = Uuid::new_v4();
        assert_eq!(ProgressionEngine::parse_task_id(Some(&id.to_string())).unwrap(), id);
    }

    #[tokio::test]
    async fn test_unknown_task_is_invalid_request() {
        let (engine, _, user, _) = setup("FRIENDS", json!({})).await;
        assert!(matches!(
            engine.check(&user, Uuid::new_v4()).await,
            Err(FarmError::InvalidRequest(_))
        ));
        assert!(matches!(
            engine.claim(&user, Uuid::new_v4()).await,
            Err(FarmError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_task_never_completes() {
        let (engine, store, user, task_id) = setup("WATER_PLANTS", json!({})).await;
        assert_eq!(engine.check(&user, task_id).await.unwrap().status, TaskStatus::None);
        assert_eq!(engine.claim(&user, task_id).await.unwrap().status, TaskStatus::None);
        assert_eq!(store.inventory_quantity(user.id, Plant::Money).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_without_nats_is_not_satisfied() {
        let (engine, _, user, task_id) = setup("SUBSCRIBE", json!({"id": "@farm"})).await;
        assert_eq!(engine.check(&user, task_id).await.unwrap().status, TaskStatus::None);
    }

    #[tokio::test]
    async fn test_claim_without_check() {
        let (engine, store, user, task_id) = setup("INVENTORY", json!({"item": "ROSE"})).await;
        store.increment_inventory(user.id, Plant::Rose, 2).await.unwrap();

        // NONE -> CLAIMED directly
        assert_eq!(engine.claim(&user, task_id).await.unwrap().status, TaskStatus::Claimed);
        assert_eq!(store.inventory_quantity(user.id, Plant::Money).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_claim_reevaluates_criteria_after_done() {
        let (engine, store, user, task_id) = setup("INVENTORY", json!({"item": "ROSE"})).await;
        store.increment_inventory(user.id, Plant::Rose, 2).await.unwrap();
        assert_eq!(engine.check(&user, task_id).await.unwrap().status, TaskStatus::Done);

        // Criteria no longer hold
        assert!(store.decrement_inventory(user.id, Plant::Rose, 1).await.unwrap());
        assert_eq!(engine.claim(&user, task_id).await.unwrap().status, TaskStatus::Done);
        assert_eq!(store.inventory_quantity(user.id, Plant::Money).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_friends_task() {
        let (engine, store, user, task_id) = setup("FRIENDS", json!({})).await;
        for external in ["2", "3"] {
            let friend = store.create_identity(external, "telegram").await.unwrap();
            store
                .insert_referral(crate::domain::Referral {
                    referrer_id: user.id,
                    referred_id: friend.identity().user_id,
                })
                .await
                .unwrap();
        }
        assert_eq!(engine.check(&user, task_id).await.unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_list_tasks_carries_status() {
        let (engine, store, user, task_id) = setup("FRIENDS", json!({})).await;
        store.mark_task_done(user.id, task_id).await.unwrap();

        let tasks = engine.list_tasks(&user).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Done);
    }
}
