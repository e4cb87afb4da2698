//! User routes
//!
//! - GET|POST /api/v1/user/auth - Exchange Telegram init data for a session
//! - GET /api/v1/user/me        - Current profile
//! - GET /api/v1/user/upgrade   - Farm level and field count
//! - GET /api/v1/user/referrals - Users invited by the caller

use chrono::Utc;
use hyper::{Method, Response};

use super::{authorize, success, ApiRequest, BoxBody};
use crate::domain::dto::AuthRequest;
use crate::server::AppState;
use crate::types::{FarmError, Result};

/// GET takes `method` and `data` from the query, POST from a JSON body
pub async fn handle_auth(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let request = if req.method == Method::POST {
        if req.body.is_empty() {
            return Err(FarmError::WrongBody("request body is required".into()));
        }
        serde_json::from_slice::<AuthRequest>(&req.body)
            .map_err(|e| FarmError::WrongDataBody(format!("invalid auth body: {}", e)))?
    } else {
        AuthRequest {
            method: req.param("method").unwrap_or_default().to_string(),
            data: req.param("data").unwrap_or_default().to_string(),
        }
    };

    let response = state
        .services
        .auth
        .authenticate_with_payload(&request.method, &request.data, Utc::now().timestamp())
        .await?;
    Ok(success(response))
}

pub async fn handle_me(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    Ok(success(state.services.users.me(&ctx.user)))
}

pub async fn handle_upgrade(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    Ok(success(state.services.users.upgrade(&ctx.user).await?))
}

pub async fn handle_referrals(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    Ok(success(state.services.users.referrals(&ctx.user).await?))
}
