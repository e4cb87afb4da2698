//! Inventory routes
//!
//! - GET /api/v1/inventory/all    - Every plant with the caller's balance
//! - GET /api/v1/inventory/fields - Planted fields
//! - GET /api/v1/inventory/plant?fieldID=&plant= - Plant from inventory

use chrono::Utc;
use hyper::Response;

use super::{authorize, success, ApiRequest, BoxBody};
use crate::server::AppState;
use crate::types::Result;

pub async fn handle_all(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    Ok(success(state.services.inventory.list(&ctx.user).await?))
}

pub async fn handle_fields(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    Ok(success(
        state.services.inventory.fields(&ctx.user, Utc::now()).await?,
    ))
}

pub async fn handle_plant(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let ctx = authorize(state, req).await?;
    let field = state
        .services
        .inventory
        .plant(&ctx.user, req.param("fieldID"), req.param("plant"), Utc::now())
        .await?;
    Ok(success(field))
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use super::super::test_support::{body_json, state};
    use super::*;
    use crate::auth::SessionIssuer;
    use crate::db::FarmStore;
    use crate::domain::Plant;

    #[tokio::test]
    async fn test_plant_then_list() {
        let (state, store) = state();
        let created = store.create_identity("31", "telegram").await.unwrap();
        let identity = created.identity();
        store
            .increment_inventory(identity.user_id, Plant::Strawberry, 1)
            .await
            .unwrap();
        let token = SessionIssuer::new_dev().issue(identity.id).unwrap();

        let req = ApiRequest::get("/api/v1/inventory/plant?fieldID=3&plant=STRAWBERRY").with_token(&token);
        let body = body_json(dispatch(&state, &req).await).await;
        assert_eq!(body["response_key"], "SUCCESS");
        assert_eq!(body["data"]["FieldID"], 3);
        assert_eq!(body["data"]["Plant"], "STRAWBERRY");

        let req = ApiRequest::get("/api/v1/inventory/all").with_token(&token);
        let body = body_json(dispatch(&state, &req).await).await;
        assert_eq!(body["data"]["items"][1]["Plant"], "STRAWBERRY");
        assert_eq!(body["data"]["items"][1]["Quantity"], 0);

        let req = ApiRequest::get("/api/v1/inventory/fields").with_token(&token);
        let body = body_json(dispatch(&state, &req).await).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_plant_without_field_id() {
        let (state, store) = state();
        let created = store.create_identity("32", "telegram").await.unwrap();
        let token = SessionIssuer::new_dev().issue(created.identity().id).unwrap();

        let req = ApiRequest::get("/api/v1/inventory/plant?plant=ROSE").with_token(&token);
        assert_eq!(
            body_json(dispatch(&state, &req).await).await["response_key"],
            "DATA_NOT_FOUND"
        );
    }
}
