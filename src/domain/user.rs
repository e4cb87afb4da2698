//! Players, their identities and their farms

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::plant::Plant;

/// Highest farm level
pub const MAX_FARM_LEVEL: u8 = 3;

/// Field slots available at a farm level. Out-of-range levels are clamped.
pub fn max_fields_for_level(level: u8) -> u32 {
    match level.clamp(1, MAX_FARM_LEVEL) {
        1 => 4,
        2 => 8,
        _ => 16,
    }
}

/// A player
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    /// Telegram user id, 0 until the profile is first filled in
    pub tg_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub icon: Option<String>,
    pub language_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A user with no profile yet
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            tg_id: 0,
            first_name: None,
            last_name: None,
            username: None,
            icon: None,
            language_code: None,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: &ProfileUpdate) {
        self.tg_id = update.tg_id;
        self.first_name = update.first_name.clone();
        self.last_name = update.last_name.clone();
        self.username = update.username.clone();
        self.icon = update.icon.clone();
        self.language_code = update.language_code.clone();
    }
}

/// Profile fields taken from a verified launch payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub tg_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub icon: Option<String>,
    pub language_code: Option<String>,
}

impl ProfileUpdate {
    /// Empty strings become `None`
    pub fn optional(value: &str) -> Option<String> {
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// Link between an external identity and a user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_id: String,
    pub method: String,
    pub created_at: DateTime<Utc>,
}

impl AuthIdentity {
    pub fn new(user_id: Uuid, external_id: &str, method: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            external_id: external_id.to_string(),
            method: method.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// `referrer` invited `referred`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Referral {
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
}

/// Farm level of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmUpgrade {
    pub user_id: Uuid,
    pub level: u8,
}

impl FarmUpgrade {
    pub fn initial(user_id: Uuid) -> Self {
        Self { user_id, level: 1 }
    }

    pub fn max_fields(&self) -> u32 {
        max_fields_for_level(self.level)
    }
}

/// A plant growing on one of a user's field slots
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlanting {
    pub user_id: Uuid,
    pub slot: u32,
    pub plant: Plant,
    pub planted_at: DateTime<Utc>,
}

impl FieldPlanting {
    pub fn ready_at(&self) -> DateTime<Utc> {
        let grow = chrono::Duration::from_std(self.plant.grow_time()).unwrap_or_default();
        self.planted_at + grow
    }

    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.ready_at() <= now
    }
}
