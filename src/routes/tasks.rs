//! Task routes
//!
//! - GET /api/v1/tasks/all             - Catalog with the caller's statuses
//! - GET /api/v1/tasks/check?taskId=   - Record completion
//! - GET /api/v1/tasks/claim?taskId=   - Pay the reward

use hyper::Response;

use super::{authorize, success, ApiRequest, BoxBody};
use crate::server::AppState;
use crate::services::ProgressionEngine;
use crate::types::Result;

pub async fn handle_all(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    Ok(success(state.services.progression.list_tasks(&ctx.user).await?))
}

pub async fn handle_check(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    let task_id = ProgressionEngine::parse_task_id(req.param("taskId"))?;
    Ok(success(state.services.progression.check(&ctx.user, task_id).await?))
}

pub async fn handle_claim(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    let task_id = ProgressionEngine::parse_task_id(req.param("taskId"))?;
    Ok(success(state.services.progression.claim(&ctx.user, task_id).await?))
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use super::super::test_support::{body_json, state};
    use super::*;
    use crate::auth::SessionIssuer;
    use crate::db::FarmStore;
    use crate::domain::{Plant, TaskDefinition};
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_check_and_claim_over_http() {
        let (state, store) = state();
        let created = store.create_identity("40", "telegram").await.unwrap();
        let identity = created.identity().clone();
        let token = SessionIssuer::new_dev().issue(identity.id).unwrap();

        let task_id = store
            .upsert_task(&TaskDefinition {
                id: Some(Uuid::new_v4()),
                name: "Grow roses".into(),
                icon: None,
                task_type: "INVENTORY".into(),
                reward: "MONEY".into(),
                reward_amount: 3,
                need_done_times: 1,
                data: json!({"item": "ROSE"}).as_object().cloned().unwrap(),
            })
            .await
            .unwrap();
        store.increment_inventory(identity.user_id, Plant::Rose, 1).await.unwrap();

        let req = ApiRequest::get(&format!("/api/v1/tasks/check?taskId={}", task_id)).with_token(&token);
        let body = body_json(dispatch(&state, &req).await).await;
        assert_eq!(body["data"]["Status"], "TASK_COMPLETE_DONE");

        let req = ApiRequest::get(&format!("/api/v1/tasks/claim?taskId={}", task_id)).with_token(&token);
        let body = body_json(dispatch(&state, &req).await).await;
        assert_eq!(body["data"]["Status"], "TASK_COMPLETE_FINISHED");

        let req = ApiRequest::get("/api/v1/tasks/all").with_token(&token);
        let body = body_json(dispatch(&state, &req).await).await;
        assert_eq!(body["data"][0]["Status"], "TASK_COMPLETE_FINISHED");
        assert_eq!(
            store.inventory_quantity(identity.user_id, Plant::Money).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_task_id_errors() {
        let (state, store) = state();
        let created = store.create_identity("41", "telegram").await.unwrap();
        let token = SessionIssuer::new_dev().issue(created.identity().id).unwrap();

        let req = ApiRequest::get("/api/v1/tasks/check").with_token(&token);
        assert_eq!(body_json(dispatch(&state, &req).await).await["response_key"], "WRONG_BODY");

        let req = ApiRequest::get("/api/v1/tasks/claim?taskId=42").with_token(&token);
        assert_eq!(
            body_json(dispatch(&state, &req).await).await["response_key"],
            "INVALID_REQUEST"
        );
    }
}
