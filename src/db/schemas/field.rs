//! Field planting document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::domain::{FieldPlanting, Plant};

pub const FIELD_COLLECTION: &str = "fields";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FieldDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,
    pub slot: i64,
    pub plant: Plant,
    pub planted_at: DateTime,
}

impl Default for FieldDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            user_id: String::new(),
            slot: 0,
            plant: Plant::Money,
            planted_at: DateTime::now(),
        }
    }
}

impl From<&FieldPlanting> for FieldDoc {
    fn from(planting: &FieldPlanting) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: planting.user_id.to_string(),
            slot: i64::from(planting.slot),
            plant: planting.plant,
            planted_at: DateTime::from_chrono(planting.planted_at),
        }
    }
}

impl FieldDoc {
    pub fn into_planting(self) -> Option<FieldPlanting> {
        Some(FieldPlanting {
            user_id: Uuid::parse_str(&self.user_id).ok()?,
            slot: u32::try_from(self.slot).ok()?,
            plant: self.plant,
            planted_at: self.planted_at.to_chrono(),
        })
    }
}

impl IntoIndexes for FieldDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "slot": 1 },
            index("user_slot_unique", true),
        )]
    }
}

impl MutMetadata for FieldDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
