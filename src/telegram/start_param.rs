//! Start parameter encoding
//!
//! The mini app start parameter is `base64("<tag>|<payload>")`. The only tag
//! in use is `ref`, whose payload is the inviting user's id.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use uuid::Uuid;

/// Tag marking a referral start parameter
pub const REFERRAL_TAG: &str = "ref";

/// Decoded start parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartParam {
    /// `ref|<payload>`; the payload is not validated here
    Referral(String),
    /// Empty, undecodable, or carrying an unrecognised tag
    Unknown,
}

impl StartParam {
    /// Decode an opaque start parameter. Never fails.
    pub fn decode(param: &str) -> Self {
        let param = param.trim();
        if param.is_empty() {
            return Self::Unknown;
        }

        let bytes = match STANDARD
            .decode(param)
            .or_else(|_| STANDARD_NO_PAD.decode(param))
        {
            Ok(b) => b,
            Err(_) => return Self::Unknown,
        };
        let text = match String::from_utf8(bytes) {
            Ok(t) => t,
            Err(_) => return Self::Unknown,
        };

        match text.split_once('|') {
            Some((REFERRAL_TAG, payload)) => Self::Referral(payload.to_string()),
            _ => Self::Unknown,
        }
    }

    /// Referrer id, when this is a referral carrying a well-formed user id
    pub fn referrer_id(&self) -> Option<Uuid> {
        match self {
            Self::Referral(payload) => Uuid::parse_str(payload.trim()).ok(),
            Self::Unknown => None,
        }
    }
}

/// Encode the referral start parameter for a user
pub fn encode_referral(user_id: Uuid) -> String {
    STANDARD.encode(format!("{}|{}", REFERRAL_TAG, user_id))
}

/// Link a user shares to invite friends
pub fn referral_link(bot_link: &str, user_id: Uuid) -> String {
    format!("{}?startapp={}", bot_link, encode_referral(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_round_trip() {
        let id = Uuid::new_v4();
        let param = StartParam::decode(&encode_referral(id));
        assert_eq!(param, StartParam::Referral(id.to_string()));
        assert_eq!(param.referrer_id(), Some(id));
    }

    #[test]
    fn test_splits_on_first_pipe_only() {
        let encoded = STANDARD.encode("ref|abc|def");
        assert_eq!(
            StartParam::decode(&encoded),
            StartParam::Referral("abc|def".into())
        );
        assert_eq!(StartParam::decode(&encoded).referrer_id(), None);
    }

    #[test]
    fn test_unpadded_base64_accepted() {
        let id = Uuid::new_v4();
        let encoded = STANDARD_NO_PAD.encode(format!("ref|{}", id));
        assert_eq!(StartParam::decode(&encoded).referrer_id(), Some(id));
    }

    #[test]
    fn test_malformed_input_is_unknown() {
        assert_eq!(StartParam::decode(""), StartParam::Unknown);
        assert_eq!(StartParam::decode("%%%not-base64"), StartParam::Unknown);
        assert_eq!(StartParam::decode(&STANDARD.encode("no-separator")), StartParam::Unknown);
        assert_eq!(StartParam::decode(&STANDARD.encode("promo|summer")), StartParam::Unknown);
        assert_eq!(StartParam::decode(&STANDARD.encode([0xff, 0xfe, b'|'])), StartParam::Unknown);
    }

    #[test]
    fn test_referral_link() {
        let id = Uuid::nil();
        let link = referral_link("https://t.me/farm_bot/app", id);
        assert!(link.starts_with("https://t.me/farm_bot/app?startapp="));
        let param = link.split("startapp=").nth(1).unwrap();
        assert_eq!(StartParam::decode(param).referrer_id(), Some(id));
    }
}
