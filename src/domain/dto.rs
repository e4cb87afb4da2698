//! Wire shapes returned inside the response envelope
//!
//! Field names follow what the game client already reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::plant::Plant;
use super::task::{Task, TaskStatus};
use super::user::{FarmUpgrade, FieldPlanting, User};
use crate::telegram::referral_link;

/// `POST /user/auth` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthRequest {
    pub method: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDto {
    #[serde(rename = "ID")]
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub referral_link: String,
    pub icon: Option<String>,
    pub language_code: Option<String>,
}

impl UserDto {
    pub fn from_user(user: &User, bot_link: &str) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            referral_link: referral_link(bot_link, user.id),
            icon: user.icon.clone(),
            language_code: user.language_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAuthResponse {
    pub user: UserDto,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserUpgradeDto {
    pub farm_lvl: u8,
    pub max_fields: u32,
}

impl From<FarmUpgrade> for UserUpgradeDto {
    fn from(upgrade: FarmUpgrade) -> Self {
        Self {
            farm_lvl: upgrade.level,
            max_fields: upgrade.max_fields(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserReferralDto {
    #[serde(rename = "ID")]
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub icon: Option<String>,
}

impl From<&User> for UserReferralDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            icon: user.icon.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserFieldDto {
    #[serde(rename = "FieldID")]
    pub field_id: u32,
    pub plant: Plant,
    /// Unix seconds
    pub plant_time: i64,
    /// Unix seconds
    pub ready_at: i64,
    pub ready: bool,
}

impl UserFieldDto {
    pub fn from_planting(field: &FieldPlanting, now: DateTime<Utc>) -> Self {
        Self {
            field_id: field.slot,
            plant: field.plant,
            plant_time: field.planted_at.timestamp(),
            ready_at: field.ready_at().timestamp(),
            ready: field.is_ready(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventoryItemDto {
    pub plant: Plant,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryResponse {
    pub items: Vec<InventoryItemDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskDto {
    #[serde(rename = "ID")]
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub reward: Plant,
    pub reward_amount: i64,
    pub need_done_times: i64,
    #[serde(rename = "Type")]
    pub task_type: String,
    pub data: Map<String, Value>,
    pub status: TaskStatus,
}

impl TaskDto {
    pub fn new(task: &Task, status: TaskStatus) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            icon: task.icon.clone(),
            reward: task.reward,
            reward_amount: task.reward_amount,
            need_done_times: task.need_done_times,
            task_type: task.kind.tag().to_string(),
            data: task.data.clone(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskKind;

    #[test]
    fn test_user_wire_names() {
        let user = User::empty();
        let json = serde_json::to_value(UserDto::from_user(&user, "https://t.me/bot/app")).unwrap();
        assert_eq!(json["ID"], user.id.to_string());
        assert!(json["FirstName"].is_null());
        assert!(json["ReferralLink"]
            .as_str()
            .unwrap()
            .starts_with("https://t.me/bot/app?startapp="));
    }

    #[test]
    fn test_task_wire_names() {
        let task = Task {
            id: Uuid::nil(),
            name: "Grow strawberries".into(),
            icon: None,
            reward: Plant::Rose,
            reward_amount: 2,
            need_done_times: 3,
            kind: TaskKind::Inventory { plant: Plant::Strawberry },
            data: serde_json::json!({"item": "STRAWBERRY"}).as_object().cloned().unwrap(),
        };
        let json = serde_json::to_value(TaskDto::new(&task, TaskStatus::Done)).unwrap();
        assert_eq!(json["Type"], "INVENTORY");
        assert_eq!(json["Reward"], "ROSE");
        assert_eq!(json["NeedDoneTimes"], 3);
        assert_eq!(json["Status"], "TASK_COMPLETE_DONE");
        assert_eq!(json["Data"]["item"], "STRAWBERRY");
    }

    #[test]
    fn test_upgrade_and_field_wire_names() {
        let json = serde_json::to_value(UserUpgradeDto::from(FarmUpgrade::initial(Uuid::nil()))).unwrap();
        assert_eq!(json["FarmLvl"], 1);
        assert_eq!(json["MaxFields"], 4);

        let field = FieldPlanting {
            user_id: Uuid::nil(),
            slot: 2,
            plant: Plant::Money,
            planted_at: Utc::now(),
        };
        let json = serde_json::to_value(UserFieldDto::from_planting(&field, Utc::now())).unwrap();
        assert_eq!(json["FieldID"], 2);
        assert_eq!(json["Plant"], "MONEY");
        assert_eq!(json["Ready"], false);
    }

    #[test]
    fn test_auth_request_defaults() {
        let req: AuthRequest = serde_json::from_str(r#"{"method":"telegram"}"#).unwrap();
        assert_eq!(req.method, "telegram");
        assert!(req.data.is_empty());
    }
}
