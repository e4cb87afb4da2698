//! User document schema

use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::domain::User;

pub const USER_COLLECTION: &str = "users";

/// Player profile
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// User id (uuid)
    pub id: String,

    /// Telegram user id, 0 until known
    #[serde(default)]
    pub tg_id: i64,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub icon: Option<String>,
    pub language_code: Option<String>,
}

impl From<&User> for UserDoc {
    fn from(user: &User) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: user.id.to_string(),
            tg_id: user.tg_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            icon: user.icon.clone(),
            language_code: user.language_code.clone(),
        }
    }
}

impl UserDoc {
    /// Convert to the domain type; `None` if the stored id is corrupt
    pub fn into_user(self) -> Option<User> {
        let id = Uuid::parse_str(&self.id).ok()?;
        let created_at = self
            .metadata
            .created_at
            .map(|d| d.to_chrono())
            .unwrap_or_else(Utc::now);

        Some(User {
            id,
            tg_id: self.tg_id,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            icon: self.icon,
            language_code: self.language_code,
            created_at,
        })
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "id": 1 }, index("id_unique", true)),
            (doc! { "tg_id": 1 }, index("tg_id_index", false)),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
