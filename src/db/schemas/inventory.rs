//! Inventory balance document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::domain::Plant;

pub const INVENTORY_COLLECTION: &str = "inventory";

/// Balance of one plant for one user. Created lazily by the first increment.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InventoryDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,
    pub plant: Plant,
    #[serde(default)]
    pub quantity: i64,
}

impl Default for InventoryDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            user_id: String::new(),
            plant: Plant::Money,
            quantity: 0,
        }
    }
}

impl IntoIndexes for InventoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "plant": 1 },
            index("user_plant_unique", true),
        )]
    }
}

impl MutMetadata for InventoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
