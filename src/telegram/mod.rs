//! Telegram mini app launch data
//!
//! Provides:
//! - Init data signature and freshness verification
//! - Typed parsing of init data (user, chat, start param)
//! - Start parameter encoding for referral links

pub mod init_data;
pub mod signature;
pub mod start_param;

pub use init_data::{parse_fields, parse_init_data, Chat, ChatType, InitData, InitDataFields, TelegramUser};
pub use signature::{sign_init_data, validate_init_data, verify_init_data, InitDataError};
pub use start_param::{encode_referral, referral_link, StartParam, REFERRAL_TAG};

/// Auth method name for Telegram identities
pub const TELEGRAM_METHOD: &str = "telegram";
