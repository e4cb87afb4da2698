//! Game domain types
//!
//! Plain values shared by the store, the services and the HTTP layer. Store
//! documents and wire DTOs are converted to and from these.

pub mod dto;
pub mod plant;
pub mod task;
pub mod user;

pub use plant::Plant;
pub use task::{Task, TaskDefinition, TaskKind, TaskStatus};
pub use user::{
    max_fields_for_level, AuthIdentity, FarmUpgrade, FieldPlanting, ProfileUpdate, Referral,
    User, MAX_FARM_LEVEL,
};
