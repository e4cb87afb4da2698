//! Init data fields and typed parsing
//!
//! Telegram hands the mini app a URL query string. Some values are plain
//! strings (`hash`, `query_id`), others are JSON documents (`user`, `chat`).
//! Parsing synthesizes one JSON object from all fields: a raw value is
//! embedded as-is when it is itself valid JSON, otherwise it is quoted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::signature::InitDataError;

/// Fields that are always treated as strings, even when they look like JSON
const STRING_FIELDS: &[&str] = &["start_param"];

/// Decoded key/value pairs of a raw init data query string.
///
/// When a key repeats, the first value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitDataFields {
    fields: BTreeMap<String, String>,
}

impl InitDataFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a URL query string
    pub fn from_query(raw: &str) -> Result<Self, InitDataError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(raw).map_err(|_| InitDataError::UnexpectedFormat)?;

        let mut fields = BTreeMap::new();
        for (key, value) in pairs {
            fields.entry(key).or_insert(value);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Re-encode as a URL query string
    pub fn to_query(&self) -> String {
        serde_urlencoded::to_string(&self.fields).unwrap_or_default()
    }
}

/// Parsed init data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitData {
    #[serde(rename = "auth_date")]
    pub auth_date_raw: i64,
    #[serde(rename = "can_send_after")]
    pub can_send_after_raw: i64,
    pub chat: Chat,
    pub chat_type: ChatType,
    pub chat_instance: i64,
    pub hash: String,
    pub query_id: String,
    pub receiver: TelegramUser,
    pub start_param: String,
    pub user: TelegramUser,
}

/// Telegram user as embedded in init data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramUser {
    pub added_to_attachment_menu: bool,
    pub allows_write_to_pm: bool,
    pub first_name: String,
    pub id: i64,
    pub is_bot: bool,
    pub is_premium: bool,
    pub last_name: String,
    pub username: String,
    pub language_code: String,
    pub photo_url: String,
}

/// Chat the mini app was launched from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub title: String,
    pub photo_url: String,
    pub username: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Sender,
    Private,
    Group,
    Supergroup,
    Channel,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Build the JSON document the typed structure is decoded from
fn synthesize_document(fields: &InitDataFields) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|(key, value)| {
            let key_json = serde_json::Value::String(key.to_string()).to_string();
            let embed_raw = !STRING_FIELDS.contains(&key)
                && serde_json::from_str::<serde::de::IgnoredAny>(value).is_ok();
            if embed_raw {
                format!("{}:{}", key_json, value)
            } else {
                format!("{}:{}", key_json, serde_json::Value::String(value.to_string()))
            }
        })
        .collect();

    format!("{{{}}}", members.join(","))
}

/// Parse decoded fields into a typed structure
pub fn parse_fields(fields: &InitDataFields) -> Result<InitData, InitDataError> {
    serde_json::from_str(&synthesize_document(fields)).map_err(|_| InitDataError::UnexpectedFormat)
}

/// Parse a raw init data query string into a typed structure
pub fn parse_init_data(raw: &str) -> Result<InitData, InitDataError> {
    parse_fields(&InitDataFields::from_query(raw)?)
}
