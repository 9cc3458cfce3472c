#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use bazaar_api::config::{AppConfig, ProviderConfig};
use bazaar_api::entities::{cart_item, product, product_inventory, user};
use bazaar_api::events::{event_channel, process_events};
use bazaar_api::{build_router, db, AppState};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const CLICK_SECRET: &str = "click-test-secret";
pub const CLICK_SERVICE_ID: &str = "7777";
pub const PAYME_KEY: &str = "payme-test-key";
pub const UZUM_SECRET: &str = "uzum-test-secret";

/// In-process application over a throwaway SQLite database.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_dir = TempDir::new().expect("temp dir");
        let db_path = db_dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut config = AppConfig::new(url, "127.0.0.1", 0, "test");
        config.payments.click = ProviderConfig {
            merchant_id: "click-merchant".into(),
            service_id: Some(CLICK_SERVICE_ID.into()),
            secret_key: CLICK_SECRET.into(),
            enabled: true,
        };
        config.payments.payme = ProviderConfig {
            merchant_id: "payme-merchant".into(),
            service_id: None,
            secret_key: PAYME_KEY.into(),
            enabled: true,
        };
        config.payments.uzum = ProviderConfig {
            merchant_id: "uzum-merchant".into(),
            service_id: Some("8888".into()),
            secret_key: UZUM_SECRET.into(),
            enabled: true,
        };

        let conn = db::establish_connection_from_app_config(&config)
            .await
            .expect("connect");
        db::run_migrations(&conn).await.expect("migrate");

        let (event_sender, event_rx) = event_channel(64);
        tokio::spawn(process_events(event_rx, None));

        let db = Arc::new(conn);
        let config = Arc::new(config);
        let state = AppState::new(db.clone(), config.clone(), event_sender);

        Self {
            router: build_router(state),
            db,
            config,
            _db_dir: db_dir,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("request")
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::GET)
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::DELETE)
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, body: String) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    pub async fn seed_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            name: Set("Test Customer".into()),
            phone: Set("+998901234567".into()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed user");
        id
    }

    pub async fn seed_product(&self, name: &str, price: i64) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.into()),
            price: Set(price),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed product");
        id
    }

    pub async fn seed_inventory(
        &self,
        product_id: Uuid,
        quantity: i32,
        backorder_lead_time_days: Option<i32>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product_inventory::ActiveModel {
            id: Set(id),
            product_id: Set(product_id),
            color: Set(String::new()),
            attribute1_value: Set(String::new()),
            attribute2_value: Set(String::new()),
            quantity: Set(quantity),
            backorder_lead_time_days: Set(backorder_lead_time_days),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed inventory");
        id
    }

    pub async fn seed_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        cart_item::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            selected_color: Set(None),
            selected_attributes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed cart item");
        id
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
