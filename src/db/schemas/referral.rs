//! Referral edge document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{index, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::domain::Referral;

pub const REFERRAL_COLLECTION: &str = "referrals";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ReferralDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub referrer_id: String,
    /// At most one edge per referred user
    pub referred_id: String,
}

impl From<Referral> for ReferralDoc {
    fn from(referral: Referral) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            referrer_id: referral.referrer_id.to_string(),
            referred_id: referral.referred_id.to_string(),
        }
    }
}

impl IntoIndexes for ReferralDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "referred_id": 1 }, index("referred_id_unique", true)),
            (doc! { "referrer_id": 1 }, index("referrer_id_index", false)),
        ]
    }
}

impl MutMetadata for ReferralDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
