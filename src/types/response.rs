//! Response envelope shared by every API route
//!
//! Each response carries an explicit kind (`response_key`) next to its data,
//! so clients never have to split an error string to learn what went wrong.

use serde::{Deserialize, Serialize};

/// Outcome kind reported to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKey {
    Success,
    DataNotFound,
    UnknownError,
    InvalidRequest,
    Unauthorized,
    WrongBody,
    WrongMethod,
    WrongDataBody,
}

impl ResponseKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::DataNotFound => "DATA_NOT_FOUND",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::WrongBody => "WRONG_BODY",
            Self::WrongMethod => "WRONG_METHOD",
            Self::WrongDataBody => "WRONG_DATA_BODY",
        }
    }
}

impl std::fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON envelope: `{"response_key": "...", "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub response_key: ResponseKey,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            response_key: ResponseKey::Success,
            data,
        }
    }

    pub fn with_key(response_key: ResponseKey, data: T) -> Self {
        Self { response_key, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_wire_names() {
        let json = serde_json::to_string(&ResponseKey::DataNotFound).unwrap();
        assert_eq!(json, "\"DATA_NOT_FOUND\"");
        assert_eq!(ResponseKey::WrongDataBody.as_str(), "WRONG_DATA_BODY");
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success("pong")).unwrap();
        assert_eq!(body["response_key"], "SUCCESS");
        assert_eq!(body["data"], "pong");
    }
}
