//! Task catalog and progression status

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::plant::Plant;

pub const SUBSCRIBE_TAG: &str = "SUBSCRIBE";
pub const FRIENDS_TAG: &str = "FRIENDS";
pub const INVENTORY_TAG: &str = "INVENTORY";

/// Task as it appears in the catalog file and the store, before decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Stable id; when absent the task is matched by name on upsert
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub task_type: String,
    pub reward: String,
    #[serde(default)]
    pub reward_amount: i64,
    #[serde(default)]
    pub need_done_times: i64,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Completion criteria, decoded from the task type tag and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Player must be subscribed to a channel
    Subscribe { channel_id: String },
    /// Player must have invited `need_done_times` friends
    Friends,
    /// Player must hold `need_done_times` units of a plant
    Inventory { plant: Plant },
    /// Unknown tag, or a known tag whose parameters did not decode.
    /// Never satisfied.
    Unrecognized { tag: String },
}

impl TaskKind {
    /// Decode criteria from a type tag and its `data` parameters
    pub fn decode(tag: &str, data: &Map<String, Value>) -> Self {
        match tag {
            SUBSCRIBE_TAG => match data.get("id") {
                Some(Value::String(id)) if !id.is_empty() => Self::Subscribe {
                    channel_id: id.clone(),
                },
                Some(Value::Number(id)) => Self::Subscribe {
                    channel_id: id.to_string(),
                },
                other => {
                    warn!("SUBSCRIBE task has no usable channel id: {:?}", other);
                    Self::unrecognized(tag)
                }
            },
            FRIENDS_TAG => Self::Friends,
            INVENTORY_TAG => match data.get("item").and_then(Value::as_str) {
                Some(name) => match Plant::from_name(name) {
                    Some(plant) => Self::Inventory { plant },
                    None => {
                        warn!("INVENTORY task names unknown plant '{}'", name);
                        Self::unrecognized(tag)
                    }
                },
                None => {
                    warn!("INVENTORY task has no item");
                    Self::unrecognized(tag)
                }
            },
            _ => Self::unrecognized(tag),
        }
    }

    fn unrecognized(tag: &str) -> Self {
        Self::Unrecognized {
            tag: tag.to_string(),
        }
    }

    /// Type tag as shown to clients
    pub fn tag(&self) -> &str {
        match self {
            Self::Subscribe { .. } => SUBSCRIBE_TAG,
            Self::Friends => FRIENDS_TAG,
            Self::Inventory { .. } => INVENTORY_TAG,
            Self::Unrecognized { tag } => tag,
        }
    }
}

/// A decoded catalog task
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub reward: Plant,
    pub reward_amount: i64,
    pub need_done_times: i64,
    pub kind: TaskKind,
    /// Raw parameters, passed through to clients
    pub data: Map<String, Value>,
}

/// Task definition that cannot be loaded at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskDecodeError {
    #[error("task '{0}' has no id")]
    MissingId(String),
    #[error("task '{name}' rewards unknown plant '{reward}'")]
    UnknownReward { name: String, reward: String },
    #[error("task '{name}' reward amount must be positive, got {amount}")]
    NonPositiveReward { name: String, amount: i64 },
    #[error("task '{name}' completion target must not be negative, got {target}")]
    NegativeTarget { name: String, target: i64 },
}

impl Task {
    pub fn from_definition(def: &TaskDefinition) -> Result<Self, TaskDecodeError> {
        let id = def
            .id
            .ok_or_else(|| TaskDecodeError::MissingId(def.name.clone()))?;
        let reward =
            Plant::from_name(&def.reward).ok_or_else(|| TaskDecodeError::UnknownReward {
                name: def.name.clone(),
                reward: def.reward.clone(),
            })?;
        if def.reward_amount <= 0 {
            return Err(TaskDecodeError::NonPositiveReward {
                name: def.name.clone(),
                amount: def.reward_amount,
            });
        }
        if def.need_done_times < 0 {
            return Err(TaskDecodeError::NegativeTarget {
                name: def.name.clone(),
                target: def.need_done_times,
            });
        }

        Ok(Self {
            id,
            name: def.name.clone(),
            icon: def.icon.clone(),
            reward,
            reward_amount: def.reward_amount,
            need_done_times: def.need_done_times,
            kind: TaskKind::decode(&def.task_type, &def.data),
            data: def.data.clone(),
        })
    }
}

/// Per-user progress on a task. Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// No record yet
    #[default]
    #[serde(rename = "TASK_COMPLETE_NULL")]
    None,
    /// Criteria met, reward not yet taken
    #[serde(rename = "TASK_COMPLETE_DONE")]
    Done,
    /// Reward issued; terminal
    #[serde(rename = "TASK_COMPLETE_FINISHED")]
    Claimed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "TASK_COMPLETE_NULL",
            Self::Done => "TASK_COMPLETE_DONE",
            Self::Claimed => "TASK_COMPLETE_FINISHED",
        }
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }
}
