//! Database schemas for the farm backend
//!
//! MongoDB document structures. Ids are stored as hyphenated uuid strings.

mod field;
mod identity;
mod inventory;
mod metadata;
mod referral;
mod task;
mod upgrade;
mod user;

pub use field::{FieldDoc, FIELD_COLLECTION};
pub use identity::{AuthIdentityDoc, AUTH_IDENTITY_COLLECTION};
pub use inventory::{InventoryDoc, INVENTORY_COLLECTION};
pub use metadata::Metadata;
pub use referral::{ReferralDoc, REFERRAL_COLLECTION};
pub use task::{TaskDoc, TaskProgressDoc, TASK_COLLECTION, TASK_PROGRESS_COLLECTION};
pub use upgrade::{UpgradeDoc, UPGRADE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};

use mongodb::options::IndexOptions;

/// Named index options, optionally unique
pub(crate) fn index(name: &str, unique: bool) -> Option<IndexOptions> {
    Some(
        IndexOptions::builder()
            .unique(unique)
            .name(name.to_string())
            .build(),
    )
}
