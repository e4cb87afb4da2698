//! Farm upgrade document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};

pub const UPGRADE_COLLECTION: &str = "upgrades";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UpgradeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,
    #[serde(default = "default_level")]
    pub farm_lvl: i32,
}

fn default_level() -> i32 {
    1
}

impl IntoIndexes for UpgradeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(doc! { "user_id": 1 }, index("user_id_unique", true))]
    }
}

impl MutMetadata for UpgradeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
