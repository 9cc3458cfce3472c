//! Payme wire format: a single JSON-RPC endpoint guarded by HTTP Basic
//! auth, with the provider's negative error codes and millisecond
//! transaction timestamps.

use crate::config::ProviderConfig;
use crate::entities::order;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const ERR_SYSTEM: i32 = -32400;
pub const ERR_INVALID_AUTH: i32 = -32504;
pub const ERR_METHOD_NOT_FOUND: i32 = -32601;
pub const ERR_INVALID_AMOUNT: i32 = -31001;
pub const ERR_TRANSACTION_NOT_FOUND: i32 = -31003;
pub const ERR_CANNOT_CANCEL: i32 = -31007;
pub const ERR_ORDER_NOT_FOUND: i32 = -31050;

pub const STATE_CREATED: i32 = 1;
pub const STATE_PERFORMED: i32 = 2;
pub const STATE_CANCELLED: i32 = -1;

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: RpcParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcParams {
    /// Provider transaction id (CreateTransaction onward).
    #[serde(default)]
    pub id: Option<String>,
    /// Amount in the provider's subunit (total × 100).
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub account: Option<RpcAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcAccount {
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: &str) -> Self {
        Self {
            result: None,
            error: Some(json!({"code": code, "message": message})),
            id,
        }
    }
}

/// Checks HTTP Basic credentials against the configured key. The login
/// part is ignored; only the password is compared, per this integration.
/// An unconfigured key (empty) skips the check for local development.
pub fn authorize(authorization: Option<&str>, cfg: &ProviderConfig) -> bool {
    if cfg.secret_key.is_empty() {
        return true;
    }
    let Some(header) = authorization else {
        return false;
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    match credentials.split_once(':') {
        Some((_login, password)) => password == cfg.secret_key,
        None => false,
    }
}

/// Provider amounts arrive in the smallest subunit; orders store integer
/// units, hence the ×100 scaling.
pub fn amount_matches(amount: Option<i64>, total: i64) -> bool {
    matches!(amount, Some(a) if a == total * 100)
}

pub fn redirect_url(cfg: &ProviderConfig, order: &order::Model) -> Option<String> {
    if !cfg.enabled {
        return None;
    }
    let payload = format!(
        "m={};ac.order_id={};a={}",
        cfg.merchant_id,
        order.id,
        order.total * 100
    );
    Some(format!(
        "https://checkout.paycom.uz/{}",
        BASE64.encode(payload)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with_key(key: &str) -> ProviderConfig {
        ProviderConfig {
            merchant_id: "m1".into(),
            service_id: None,
            secret_key: key.into(),
            enabled: true,
        }
    }

    fn basic(login: &str, password: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{}:{}", login, password)))
    }

    #[test]
    fn authorize_accepts_matching_password() {
        let cfg = cfg_with_key("topsecret");
        assert!(authorize(Some(&basic("Paycom", "topsecret")), &cfg));
    }

    #[test]
    fn authorize_rejects_wrong_password_and_malformed_headers() {
        let cfg = cfg_with_key("topsecret");
        assert!(!authorize(Some(&basic("Paycom", "wrong")), &cfg));
        assert!(!authorize(Some("Bearer abc"), &cfg));
        assert!(!authorize(Some("Basic !!!not-base64!!!"), &cfg));
        assert!(!authorize(None, &cfg));
    }

    #[test]
    fn authorize_skips_when_unconfigured() {
        let cfg = cfg_with_key("");
        assert!(authorize(None, &cfg));
    }

    #[test]
    fn amount_uses_subunit_scaling() {
        assert!(amount_matches(Some(2_000_000), 20_000));
        assert!(!amount_matches(Some(20_000), 20_000));
        assert!(!amount_matches(None, 20_000));
    }

    #[test]
    fn redirect_url_encodes_merchant_order_and_amount() {
        let cfg = cfg_with_key("k");
        let now = chrono::Utc::now();
        let order = order::Model {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            total: 20_000,
            status: order::OrderStatus::Reviewing,
            payment_method: order::PaymentMethod::Payme,
            payment_status: order::PaymentStatus::Pending,
            payment_id: None,
            has_backorder: false,
            estimated_delivery_days: 3,
            delivery_address: "Tashkent".into(),
            customer_name: "Aziz".into(),
            customer_phone: "+998901234567".into(),
            receipt_url: None,
            created_at: now,
            updated_at: now,
        };
        let url = redirect_url(&cfg, &order).expect("url");
        let encoded = url.trim_start_matches("https://checkout.paycom.uz/");
        let decoded = String::from_utf8(BASE64.decode(encoded).expect("base64")).expect("utf8");
        assert_eq!(
            decoded,
            format!("m=m1;ac.order_id={};a=2000000", order.id)
        );
    }

    #[test]
    fn rpc_error_shape() {
        let resp = RpcResponse::error(Some(json!(7)), ERR_ORDER_NOT_FOUND, "Order not found");
        let v = serde_json::to_value(&resp).expect("json");
        assert_eq!(v["error"]["code"], -31050);
        assert_eq!(v["id"], 7);
        assert!(v.get("result").is_none());
    }
}
