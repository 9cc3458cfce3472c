mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bazaar_api::services::payments::click::{signature, ClickCallback};
use bazaar_api::services::payments::uzum::sign_body;
use common::{assert_status, response_json, TestApp, CLICK_SECRET, CLICK_SERVICE_ID, PAYME_KEY, UZUM_SECRET};
use serde_json::{json, Value};
use uuid::Uuid;

/// Seeds a user/product/cart and checks out, returning (user_id, order_id, total).
async fn place_order(app: &TestApp, payment_method: &str) -> (Uuid, Uuid, i64) {
    let user_id = app.seed_user().await;
    let product_id = app.seed_product("Boot", 10_000).await;
    app.seed_inventory(product_id, 5, None).await;
    app.seed_cart_item(user_id, product_id, 2).await;

    let response = app
        .post_json(
            "/api/v1/checkout",
            &json!({
                "user_id": user_id,
                "payment_method": payment_method,
                "delivery_address": "Tashkent, Amir Temur 1",
                "customer_name": "Aziz",
                "customer_phone": "+998901234567",
            }),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id = Uuid::parse_str(body["data"]["order_id"].as_str().expect("order_id"))
        .expect("order uuid");
    (user_id, order_id, 20_000)
}

async fn payment_status(app: &TestApp, order_id: Uuid) -> String {
    let order = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    order["data"]["payment_status"]
        .as_str()
        .expect("payment_status")
        .to_string()
}

async fn order_status(app: &TestApp, order_id: Uuid) -> String {
    let order = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    order["data"]["status"].as_str().expect("status").to_string()
}

// -- click ----------------------------------------------------------------

fn click_form(order_id: Uuid, amount: &str, action: i32, error: Option<i32>) -> String {
    let mut callback = ClickCallback {
        click_trans_id: 987654,
        service_id: CLICK_SERVICE_ID.into(),
        merchant_trans_id: order_id.to_string(),
        amount: amount.into(),
        action,
        error,
        // Free of characters that need form encoding.
        sign_time: "20260830120000".into(),
        sign_string: String::new(),
    };
    callback.sign_string = signature(CLICK_SECRET, &callback);
    encode_click_form(&callback)
}

fn encode_click_form(cb: &ClickCallback) -> String {
    let mut form = format!(
        "click_trans_id={}&service_id={}&merchant_trans_id={}&amount={}&action={}&sign_time={}&sign_string={}",
        cb.click_trans_id,
        cb.service_id,
        cb.merchant_trans_id,
        cb.amount,
        cb.action,
        cb.sign_time,
        cb.sign_string,
    );
    if let Some(error) = cb.error {
        form.push_str(&format!("&error={}", error));
    }
    form
}

#[tokio::test]
async fn click_prepare_then_complete_settles_paid() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "click").await;

    let prepare = app
        .post_form("/webhooks/click/prepare", click_form(order_id, "20000", 0, None))
        .await;
    let body = response_json(prepare).await;
    assert_eq!(body["error"], 0);
    assert!(body["merchant_prepare_id"].is_i64());

    let complete = app
        .post_form("/webhooks/click/complete", click_form(order_id, "20000", 1, None))
        .await;
    let body = response_json(complete).await;
    assert_eq!(body["error"], 0);
    assert!(body["merchant_confirm_id"].is_i64());

    assert_eq!(payment_status(&app, order_id).await, "paid");
    assert_eq!(order_status(&app, order_id).await, "paid");
}

#[tokio::test]
async fn click_rejects_bad_signature_without_mutation() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "click").await;

    let mut form = click_form(order_id, "20000", 1, None);
    form = form.replace("sign_string=", "sign_string=0000");
    let response = app.post_form("/webhooks/click/complete", form).await;
    let body = response_json(response).await;
    assert_eq!(body["error"], -1);
    assert_eq!(body["error_note"], "SIGN CHECK FAILED!");
    assert_eq!(payment_status(&app, order_id).await, "pending");
}

#[tokio::test]
async fn click_rejects_amount_mismatch() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "click").await;

    let response = app
        .post_form("/webhooks/click/prepare", click_form(order_id, "19999", 0, None))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["error"], -2);
    assert_eq!(payment_status(&app, order_id).await, "pending");
}

#[tokio::test]
async fn click_rejects_unknown_order() {
    let app = TestApp::spawn().await;
    place_order(&app, "click").await;

    let response = app
        .post_form(
            "/webhooks/click/prepare",
            click_form(Uuid::new_v4(), "20000", 0, None),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["error"], -5);
}

#[tokio::test]
async fn click_complete_is_idempotent_under_redelivery() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "click").await;

    let first = app
        .post_form("/webhooks/click/complete", click_form(order_id, "20000", 1, None))
        .await;
    assert_eq!(response_json(first).await["error"], 0);
    assert_eq!(payment_status(&app, order_id).await, "paid");

    let second = app
        .post_form("/webhooks/click/complete", click_form(order_id, "20000", 1, None))
        .await;
    assert_eq!(response_json(second).await["error"], 0);
    assert_eq!(payment_status(&app, order_id).await, "paid");
}

#[tokio::test]
async fn click_provider_error_marks_payment_failed_but_order_stays_reviewing() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "click").await;

    let response = app
        .post_form(
            "/webhooks/click/complete",
            click_form(order_id, "20000", 1, Some(-1)),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["error"], -9);

    assert_eq!(payment_status(&app, order_id).await, "failed");
    assert_eq!(order_status(&app, order_id).await, "reviewing");
}

// -- payme ----------------------------------------------------------------

async fn payme_rpc(app: &TestApp, key: Option<&str>, body: &Value) -> Value {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/payme")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        let credentials = BASE64.encode(format!("Paycom:{}", key));
        builder = builder.header(header::AUTHORIZATION, format!("Basic {}", credentials));
    }
    let response = app
        .request(builder.body(Body::from(body.to_string())).expect("request"))
        .await;
    response_json(response).await
}

#[tokio::test]
async fn payme_requires_basic_auth() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "payme").await;

    let body = json!({
        "id": 1,
        "method": "CheckPerformTransaction",
        "params": {"amount": 2_000_000, "account": {"order_id": order_id}},
    });
    let unauthorized = payme_rpc(&app, None, &body).await;
    assert_eq!(unauthorized["error"]["code"], -32504);

    let wrong = payme_rpc(&app, Some("wrong-key"), &body).await;
    assert_eq!(wrong["error"]["code"], -32504);

    let ok = payme_rpc(&app, Some(PAYME_KEY), &body).await;
    assert_eq!(ok["result"]["allow"], true);
}

#[tokio::test]
async fn payme_check_rejects_amount_mismatch() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "payme").await;

    // Amount arrives in subunits; a bare total is off by ×100.
    let response = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 2,
            "method": "CheckPerformTransaction",
            "params": {"amount": 20_000, "account": {"order_id": order_id}},
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -31001);
    assert_eq!(payment_status(&app, order_id).await, "pending");
}

#[tokio::test]
async fn payme_full_lifecycle_create_perform() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "payme").await;

    let create = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 3,
            "method": "CreateTransaction",
            "params": {"id": "payme-tx-1", "amount": 2_000_000, "account": {"order_id": order_id}},
        }),
    )
    .await;
    assert_eq!(create["result"]["state"], 1);
    assert_eq!(create["result"]["transaction"], "payme-tx-1");

    let perform = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 4,
            "method": "PerformTransaction",
            "params": {"id": "payme-tx-1"},
        }),
    )
    .await;
    assert_eq!(perform["result"]["state"], 2);
    assert_eq!(payment_status(&app, order_id).await, "paid");

    // Re-delivery returns the success shape without re-mutation.
    let replay = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 5,
            "method": "PerformTransaction",
            "params": {"id": "payme-tx-1"},
        }),
    )
    .await;
    assert_eq!(replay["result"]["state"], 2);
    assert_eq!(payment_status(&app, order_id).await, "paid");
}

#[tokio::test]
async fn payme_cannot_cancel_a_paid_order() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "payme").await;

    payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 6,
            "method": "CreateTransaction",
            "params": {"id": "payme-tx-2", "amount": 2_000_000, "account": {"order_id": order_id}},
        }),
    )
    .await;
    payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({"id": 7, "method": "PerformTransaction", "params": {"id": "payme-tx-2"}}),
    )
    .await;
    assert_eq!(payment_status(&app, order_id).await, "paid");

    let cancel = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({"id": 8, "method": "CancelTransaction", "params": {"id": "payme-tx-2"}}),
    )
    .await;
    assert_eq!(cancel["error"]["code"], -31007);
    assert_eq!(payment_status(&app, order_id).await, "paid");
}

#[tokio::test]
async fn payme_cancel_before_perform_cancels_the_order() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "payme").await;

    payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 9,
            "method": "CreateTransaction",
            "params": {"id": "payme-tx-3", "amount": 2_000_000, "account": {"order_id": order_id}},
        }),
    )
    .await;

    let cancel = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({"id": 10, "method": "CancelTransaction", "params": {"id": "payme-tx-3"}}),
    )
    .await;
    assert_eq!(cancel["result"]["state"], -1);
    assert_eq!(payment_status(&app, order_id).await, "cancelled");
    assert_eq!(order_status(&app, order_id).await, "cancelled");
}

#[tokio::test]
async fn payme_unknown_method_and_order() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "payme").await;

    let unknown_method = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({"id": 11, "method": "GetStatement", "params": {}}),
    )
    .await;
    assert_eq!(unknown_method["error"]["code"], -32601);

    let unknown_order = payme_rpc(
        &app,
        Some(PAYME_KEY),
        &json!({
            "id": 12,
            "method": "CheckPerformTransaction",
            "params": {"amount": 2_000_000, "account": {"order_id": Uuid::new_v4()}},
        }),
    )
    .await;
    assert_eq!(unknown_order["error"]["code"], -31050);
    assert_eq!(payment_status(&app, order_id).await, "pending");
}

// -- uzum -----------------------------------------------------------------

async fn uzum_confirm(
    app: &TestApp,
    body: String,
    signature: Option<String>,
) -> axum::http::Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/uzum/confirm")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("X-Signature", signature);
    }
    app.request(builder.body(Body::from(body)).expect("request"))
        .await
}

#[tokio::test]
async fn uzum_confirm_settles_paid_with_valid_signature() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "uzum").await;

    let body = json!({"transactionId": order_id}).to_string();
    let sig = sign_body(UZUM_SECRET, body.as_bytes());
    let response = uzum_confirm(&app, body.clone(), Some(sig.clone())).await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(payment_status(&app, order_id).await, "paid");

    // Replay is acknowledged without re-mutation.
    let replay = uzum_confirm(&app, body, Some(sig)).await;
    assert_status(&replay, StatusCode::OK);
    assert_eq!(payment_status(&app, order_id).await, "paid");
}

#[tokio::test]
async fn uzum_confirm_rejects_missing_or_bad_signature() {
    let app = TestApp::spawn().await;
    let (_, order_id, _) = place_order(&app, "uzum").await;

    let body = json!({"transactionId": order_id}).to_string();

    let missing = uzum_confirm(&app, body.clone(), None).await;
    assert_status(&missing, StatusCode::UNAUTHORIZED);

    let tampered = uzum_confirm(
        &app,
        body,
        Some(sign_body("wrong-secret", b"something else")),
    )
    .await;
    assert_status(&tampered, StatusCode::UNAUTHORIZED);

    assert_eq!(payment_status(&app, order_id).await, "pending");
}

#[tokio::test]
async fn uzum_confirm_unknown_order_is_not_found() {
    let app = TestApp::spawn().await;
    place_order(&app, "uzum").await;

    let body = json!({"transactionId": Uuid::new_v4()}).to_string();
    let sig = sign_body(UZUM_SECRET, body.as_bytes());
    let response = uzum_confirm(&app, body, Some(sig)).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

// -- manual card transfer review ------------------------------------------

#[tokio::test]
async fn card_transfer_confirm_and_reject_paths() {
    let app = TestApp::spawn().await;

    // Confirm path.
    let user_id = app.seed_user().await;
    let product_id = app.seed_product("Coat", 50_000).await;
    app.seed_inventory(product_id, 4, None).await;
    app.seed_cart_item(user_id, product_id, 1).await;
    let response = app
        .post_json(
            "/api/v1/checkout",
            &json!({
                "user_id": user_id,
                "payment_method": "card_transfer",
                "delivery_address": "Tashkent",
                "customer_name": "Aziz",
                "customer_phone": "+998901234567",
                "receipt_url": "https://cdn.example/r1.jpg",
            }),
        )
        .await;
    let order_id = response_json(response).await["data"]["order_id"]
        .as_str()
        .expect("order_id")
        .to_string();

    let confirm = app
        .post_json(
            &format!("/api/v1/orders/{}/confirm-payment", order_id),
            &json!({}),
        )
        .await;
    assert_status(&confirm, StatusCode::OK);
    let order_id = Uuid::parse_str(&order_id).expect("uuid");
    assert_eq!(payment_status(&app, order_id).await, "paid");
    assert_eq!(order_status(&app, order_id).await, "paid");

    // Confirming again conflicts: the order left awaiting_verification.
    let again = app
        .post_json(
            &format!("/api/v1/orders/{}/confirm-payment", order_id),
            &json!({}),
        )
        .await;
    assert_status(&again, StatusCode::CONFLICT);

    // Reject path.
    app.seed_cart_item(user_id, product_id, 1).await;
    let response = app
        .post_json(
            "/api/v1/checkout",
            &json!({
                "user_id": user_id,
                "payment_method": "card_transfer",
                "delivery_address": "Tashkent",
                "customer_name": "Aziz",
                "customer_phone": "+998901234567",
                "receipt_url": "https://cdn.example/r2.jpg",
            }),
        )
        .await;
    let rejected_id = response_json(response).await["data"]["order_id"]
        .as_str()
        .expect("order_id")
        .to_string();
    let reject = app
        .post_json(
            &format!("/api/v1/orders/{}/reject-payment", rejected_id),
            &json!({}),
        )
        .await;
    assert_status(&reject, StatusCode::OK);
    let rejected_id = Uuid::parse_str(&rejected_id).expect("uuid");
    assert_eq!(payment_status(&app, rejected_id).await, "failed");
    assert_eq!(order_status(&app, rejected_id).await, "reviewing");
}
