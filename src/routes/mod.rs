//! HTTP routes for the game API
//!
//! Everything lives under `/api/v1` except the health checks:
//! - /health, /healthz - Liveness
//! - /version - Build info
//!
//! Every response is a `{"response_key", "data"}` envelope.

pub mod health;
pub mod inventory;
pub mod response;
pub mod tasks;
pub mod user;

use bytes::Bytes;
use hyper::{Method, Response};
use std::collections::HashMap;

pub use response::{
    apply_common_headers, error_response, not_found_response, parse_query, preflight_response,
    success, BoxBody,
};

use crate::server::AppState;
use crate::services::AuthContext;
use crate::types::{FarmError, Result};

pub const API_PREFIX: &str = "/api/v1";

/// A fully read inbound request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn new(method: Method, path: &str) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        Self {
            method,
            path: path.to_string(),
            query: parse_query(query),
            authorization: None,
            body: Bytes::new(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.authorization = Some(format!("Bearer {}", token));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Query parameter value
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

async fn authorize(state: &AppState, req: &ApiRequest) -> Result<AuthContext> {
    state
        .services
        .auth
        .authorize(req.authorization.as_deref())
        .await
}

/// Paths that exist under some method
const KNOWN_PATHS: &[&str] = &[
    "/health",
    "/healthz",
    "/version",
    "/api/v1/ping",
    "/api/v1/user/auth",
    "/api/v1/user/me",
    "/api/v1/user/upgrade",
    "/api/v1/user/referrals",
    "/api/v1/inventory/all",
    "/api/v1/inventory/fields",
    "/api/v1/inventory/plant",
    "/api/v1/tasks/all",
    "/api/v1/tasks/check",
    "/api/v1/tasks/claim",
];

/// Route a request to its handler
pub async fn dispatch(state: &AppState, req: &ApiRequest) -> Response<BoxBody> {
    if req.method == Method::OPTIONS {
        return preflight_response();
    }

    let path = req.path.trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    let result = match (&req.method, path) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => Ok(health::health_check(state)),
        (&Method::GET, "/version") => Ok(health::version_info()),
        (&Method::GET, "/api/v1/ping") => Ok(success("pong")),

        (&Method::GET, "/api/v1/user/auth") | (&Method::POST, "/api/v1/user/auth") => {
            user::handle_auth(state, req).await
        }
        (&Method::GET, "/api/v1/user/me") => user::handle_me(state, req).await,
        (&Method::GET, "/api/v1/user/upgrade") => user::handle_upgrade(state, req).await,
        (&Method::GET, "/api/v1/user/referrals") => user::handle_referrals(state, req).await,

        (&Method::GET, "/api/v1/inventory/all") => inventory::handle_all(state, req).await,
        (&Method::GET, "/api/v1/inventory/fields") => inventory::handle_fields(state, req).await,
        (&Method::GET, "/api/v1/inventory/plant") => inventory::handle_plant(state, req).await,

        (&Method::GET, "/api/v1/tasks/all") => tasks::handle_all(state, req).await,
        (&Method::GET, "/api/v1/tasks/check") => tasks::handle_check(state, req).await,
        (&Method::GET, "/api/v1/tasks/claim") => tasks::handle_claim(state, req).await,

        (method, p) if KNOWN_PATHS.contains(&p) => Err(FarmError::WrongMethod(format!(
            "{} is not allowed on {}",
            method, p
        ))),
        (_, p) => return not_found_response(p),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::Args;
    use crate::db::MemoryStore;
    use crate::server::Backends;
    use crate::services::DisabledSubscriptionChecker;
    use clap::Parser;
    use http_body_util::BodyExt;
    use std::sync::Arc;

    pub const BOT_TOKEN: &str = "1234567:route-test-token";

    pub fn state() -> (AppState, Arc<MemoryStore>) {
        let args = Args::parse_from([
            "crazyfarm",
            "--dev-mode",
            "--telegram-token",
            BOT_TOKEN,
            "--telegram-bot-link",
            "https://t.me/farm_bot/app",
        ]);
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            &args,
            store.clone(),
            Arc::new(DisabledSubscriptionChecker),
            Backends {
                store: "memory",
                subscriptions: "disabled",
            },
        )
        .unwrap();
        (state, store)
    }

    pub async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{body_json, state};
    use super::*;
    use hyper::StatusCode;

    #[tokio::test]
    async fn test_ping() {
        let (state, _) = state();
        let response = dispatch(&state, &ApiRequest::get("/api/v1/ping")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response_key"], "SUCCESS");
        assert_eq!(body["data"], "pong");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (state, _) = state();
        let response = dispatch(&state, &ApiRequest::get("/api/v1/barn")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["response_key"], "DATA_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let (state, _) = state();
        let response = dispatch(&state, &ApiRequest::new(Method::POST, "/api/v1/tasks/all")).await;
        assert_eq!(body_json(response).await["response_key"], "WRONG_METHOD");
    }

    #[tokio::test]
    async fn test_preflight() {
        let (state, _) = state();
        let response = dispatch(&state, &ApiRequest::new(Method::OPTIONS, "/api/v1/user/me")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let (state, _) = state();
        for path in ["/api/v1/user/me", "/api/v1/inventory/all", "/api/v1/tasks/all"] {
            let response = dispatch(&state, &ApiRequest::get(path)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = body_json(response).await;
            assert_eq!(body["response_key"], "UNAUTHORIZED");
            assert_eq!(body["data"], "");
        }
    }
}
