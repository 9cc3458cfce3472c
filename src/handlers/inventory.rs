use crate::handlers::common::{success_response, validate_input};
use crate::{AppState, ServiceError};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RestockRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub attribute1_value: Option<String>,
    #[serde(default)]
    pub attribute2_value: Option<String>,
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i32,
    #[serde(default)]
    pub backorder_lead_time_days: Option<i32>,
}

/// Variant stock rows for one product
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Stock rows")),
    tag = "inventory"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let rows = state.services.inventory.list_stock(product_id).await?;
    Ok(success_response(rows))
}

/// Restock a variant (absolute quantity upsert)
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock row upserted"),
        (status = 422, description = "Invalid request")
    ),
    tag = "inventory"
)]
pub async fn restock(
    State(state): State<AppState>,
    Json(request): Json<RestockRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let row = state
        .services
        .inventory
        .restock(
            request.product_id,
            request.color.unwrap_or_default(),
            request.attribute1_value.unwrap_or_default(),
            request.attribute2_value.unwrap_or_default(),
            request.quantity,
            request.backorder_lead_time_days,
        )
        .await?;
    Ok(success_response(row))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", post(restock))
        .route("/inventory/:product_id", get(list_stock))
}
