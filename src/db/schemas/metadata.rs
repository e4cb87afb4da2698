//! Common metadata for all documents

use bson::{doc, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Creation, update and soft deletion timestamps
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }

    /// `$setOnInsert` fields for upserts. `metadata.updated_at` is left to
    /// the caller's `$set`.
    pub fn on_insert() -> Document {
        doc! {
            "metadata.is_deleted": false,
            "metadata.created_at": DateTime::now(),
        }
    }
}
