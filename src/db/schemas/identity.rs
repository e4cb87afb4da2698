//! Auth identity document schema
//!
//! Links an external identity (method + external id) to exactly one user.

use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::domain::AuthIdentity;

pub const AUTH_IDENTITY_COLLECTION: &str = "auth_identities";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AuthIdentityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub id: String,
    pub user_id: String,
    /// Telegram user id for the `telegram` method
    pub external_id: String,
    pub method: String,
}

impl From<&AuthIdentity> for AuthIdentityDoc {
    fn from(identity: &AuthIdentity) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: identity.id.to_string(),
            user_id: identity.user_id.to_string(),
            external_id: identity.external_id.clone(),
            method: identity.method.clone(),
        }
    }
}

impl AuthIdentityDoc {
    pub fn into_identity(self) -> Option<AuthIdentity> {
        Some(AuthIdentity {
            id: Uuid::parse_str(&self.id).ok()?,
            user_id: Uuid::parse_str(&self.user_id).ok()?,
            external_id: self.external_id,
            method: self.method,
            created_at: self
                .metadata
                .created_at
                .map(|d| d.to_chrono())
                .unwrap_or_else(Utc::now),
        })
    }
}

impl IntoIndexes for AuthIdentityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "external_id": 1, "method": 1 },
                index("external_id_method_unique", true),
            ),
            (doc! { "id": 1 }, index("id_unique", true)),
        ]
    }
}

impl MutMetadata for AuthIdentityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
