//! Provider webhook endpoints. Responses here are always the provider's
//! expected wire shape, never the generic API envelope; providers retry
//! based on those shapes.

pub mod click;
pub mod payme;
pub mod uzum;

use crate::AppState;
use axum::routing::post;
use axum::Router;

/// Webhook routes, mounted at the application root as registered with the
/// providers.
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/click/prepare", post(click::prepare))
        .route("/webhooks/click/complete", post(click::complete))
        .route("/webhooks/payme", post(payme::handle))
        .route("/webhooks/uzum/confirm", post(uzum::confirm))
}
