pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod notifications;
pub mod openapi;
pub mod services;

pub use config::AppConfig;
pub use errors::ServiceError;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use events::EventSender;
use handlers::AppServices;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: EventSender,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>, events: EventSender) -> Self {
        let services = AppServices::new(db.clone(), &config, events.clone());
        Self {
            db,
            config,
            event_sender: events,
            services,
        }
    }
}

/// Standard response envelope for the JSON API. Provider webhooks bypass
/// this and answer in each provider's own wire shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe
pub async fn health_check() -> (StatusCode, Json<StatusResponse>) {
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Versioned status endpoint mirroring `/health`.
pub async fn api_status() -> (StatusCode, Json<StatusResponse>) {
    health_check().await
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .merge(handlers::checkout::checkout_routes())
        .merge(handlers::cart::cart_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::inventory::inventory_routes())
}

/// The complete application router: versioned API, root-level webhooks,
/// health probe, and Swagger UI.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(openapi::swagger_ui())
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(handlers::webhooks::webhook_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
