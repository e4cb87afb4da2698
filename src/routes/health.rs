//! Health check endpoints
//!
//! - /health, /healthz - Liveness check
//! - /version - Build information for deployment verification

use hyper::Response;
use serde::Serialize;

use super::{success, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub dev_mode: bool,
    pub store: &'static str,
    pub subscriptions: &'static str,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    success(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        dev_mode: state.dev_mode,
        store: state.backends.store,
        subscriptions: state.backends.subscriptions,
    })
}

pub fn version_info() -> Response<BoxBody> {
    success(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "crazyfarm",
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, state};
    use super::*;

    #[tokio::test]
    async fn test_health_reports_backends() {
        let (state, _) = state();
        let body = body_json(health_check(&state)).await;
        assert_eq!(body["data"]["healthy"], true);
        assert_eq!(body["data"]["store"], "memory");
    }

    #[tokio::test]
    async fn test_version_info() {
        let body = body_json(version_info()).await;
        assert_eq!(body["data"]["service"], "crazyfarm");
    }
}
