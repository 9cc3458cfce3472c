mod common;

use axum::http::StatusCode;
use common::{assert_status, response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn adding_the_same_variant_increments_quantity() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_user().await;
    let product_id = app.seed_product("Boot", 10_000).await;

    let body = json!({
        "user_id": user_id,
        "product_id": product_id,
        "quantity": 1,
        "selected_color": "black",
        "selected_attributes": [{"name": "size", "value": "42"}],
    });
    let first = app.post_json("/api/v1/cart/items", &body).await;
    assert_status(&first, StatusCode::CREATED);
    let second = app.post_json("/api/v1/cart/items", &body).await;
    assert_status(&second, StatusCode::CREATED);

    let cart = response_json(app.get(&format!("/api/v1/cart?user_id={}", user_id)).await).await;
    let lines = cart["data"].as_array().expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 2);
    assert_eq!(lines[0]["line_total"], 20_000);
    assert_eq!(lines[0]["selected_attributes"][0]["value"], "42");
}

#[tokio::test]
async fn different_variants_stay_separate_lines() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_user().await;
    let product_id = app.seed_product("Boot", 10_000).await;

    for color in ["black", "brown"] {
        let response = app
            .post_json(
                "/api/v1/cart/items",
                &json!({
                    "user_id": user_id,
                    "product_id": product_id,
                    "quantity": 1,
                    "selected_color": color,
                }),
            )
            .await;
        assert_status(&response, StatusCode::CREATED);
    }

    let cart = response_json(app.get(&format!("/api/v1/cart?user_id={}", user_id)).await).await;
    assert_eq!(cart["data"].as_array().expect("lines").len(), 2);
}

#[tokio::test]
async fn remove_and_clear_cart_lines() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_user().await;
    let product_a = app.seed_product("Boot", 10_000).await;
    let product_b = app.seed_product("Belt", 2_000).await;
    let line_a = app.seed_cart_item(user_id, product_a, 1).await;
    app.seed_cart_item(user_id, product_b, 2).await;

    let removed = app.delete(&format!("/api/v1/cart/items/{}", line_a)).await;
    assert_status(&removed, StatusCode::OK);

    let cart = response_json(app.get(&format!("/api/v1/cart?user_id={}", user_id)).await).await;
    assert_eq!(cart["data"].as_array().expect("lines").len(), 1);

    let cleared = app.delete(&format!("/api/v1/cart?user_id={}", user_id)).await;
    let body = response_json(cleared).await;
    assert_eq!(body["data"]["removed"], 1);

    let cart = response_json(app.get(&format!("/api/v1/cart?user_id={}", user_id)).await).await;
    assert_eq!(cart["data"].as_array().expect("lines").len(), 0);
}

#[tokio::test]
async fn invalid_quantity_is_rejected() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_user().await;
    let product_id = app.seed_product("Boot", 10_000).await;

    let response = app
        .post_json(
            "/api/v1/cart/items",
            &json!({
                "user_id": user_id,
                "product_id": product_id,
                "quantity": 0,
            }),
        )
        .await;
    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn removing_a_missing_line_is_not_found() {
    let app = TestApp::spawn().await;
    let response = app
        .delete(&format!("/api/v1/cart/items/{}", uuid::Uuid::new_v4()))
        .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}
