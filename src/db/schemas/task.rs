//! Task catalog and task progress document schemas

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::domain::{TaskDefinition, TaskStatus};

pub const TASK_COLLECTION: &str = "tasks";
pub const TASK_PROGRESS_COLLECTION: &str = "task_progress";

/// Catalog task, stored undecoded
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub id: String,
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

impl TaskDoc {
    pub fn new(id: Uuid, definition: &TaskDefinition) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: id.to_string(),
            name: definition.name.clone(),
            icon: definition.icon.clone(),
            task_type: definition.task_type.clone(),
            reward: definition.reward.clone(),
            reward_amount: definition.reward_amount,
            need_done_times: definition.need_done_times,
            data: definition.data.clone(),
        }
    }

    pub fn into_definition(self) -> TaskDefinition {
        TaskDefinition {
            id: Uuid::parse_str(&self.id).ok(),
            name: self.name,
            icon: self.icon,
            task_type: self.task_type,
            reward: self.reward,
            reward_amount: self.reward_amount,
            need_done_times: self.need_done_times,
            data: self.data,
        }
    }
}

impl IntoIndexes for TaskDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "id": 1 }, index("id_unique", true)),
            (doc! { "name": 1 }, index("name_index", false)),
        ]
    }
}

impl MutMetadata for TaskDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Per (user, task) progress. No document means `TaskStatus::None`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskProgressDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,
    pub task_id: String,
    pub status: TaskStatus,
}

impl IntoIndexes for TaskProgressDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "task_id": 1 },
            index("user_task_unique", true),
        )]
    }
}

impl MutMetadata for TaskProgressDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
