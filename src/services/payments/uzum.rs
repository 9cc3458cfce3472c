//! Uzum wire format: JSON confirm callback authenticated by an
//! HMAC-SHA256 signature over the raw request body.

use crate::config::ProviderConfig;
use crate::entities::order;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    /// Provider-side reference; this integration uses the order id.
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConfirmResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

/// Verifies the hex HMAC-SHA256 signature over the raw body. Comparison is
/// constant-time via `Mac::verify_slice`. Returns true when no secret is
/// configured (local development).
pub fn verify_signature(cfg: &ProviderConfig, body: &[u8], signature_hex: Option<&str>) -> bool {
    if cfg.secret_key.is_empty() {
        return true;
    }
    let Some(signature_hex) = signature_hex else {
        return false;
    };
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(cfg.secret_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Hex HMAC-SHA256 of a body; test harness and docs use this to produce
/// valid callback signatures.
pub fn sign_body(secret_key: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn redirect_url(cfg: &ProviderConfig, order: &order::Model) -> Option<String> {
    if !cfg.enabled {
        return None;
    }
    let service_id = cfg.service_id.as_deref()?;
    let mut url = Url::parse("https://www.uzumbank.uz/open-service").ok()?;
    url.query_pairs_mut()
        .append_pair("serviceId", service_id)
        .append_pair("merchantId", &cfg.merchant_id)
        .append_pair("amount", &order.total.to_string())
        .append_pair("orderId", &order.id.to_string());
    Some(url.into())
}
