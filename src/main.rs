use anyhow::Context;
use bazaar_api::config::{init_tracing, load_config};
use bazaar_api::events::{event_channel, process_events};
use bazaar_api::notifications::NotificationService;
use bazaar_api::{build_router, db, AppState};
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);
    info!(
        environment = %config.environment,
        "Starting bazaar-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = db::establish_connection_from_app_config(&config)
        .await
        .context("failed to connect to the database")?;
    if config.auto_migrate {
        db::run_migrations(&db).await.context("migrations failed")?;
    }

    let (event_sender, event_rx) = event_channel(config.event_channel_capacity);
    let notifications = NotificationService::from_config(&config.notifications);
    if notifications.is_none() {
        info!("Order notifications disabled (no URL configured)");
    }
    tokio::spawn(process_events(event_rx, notifications));

    let cors = cors_layer(config.cors_allowed_origins.as_deref());

    let config = Arc::new(config);
    let state = AppState::new(Arc::new(db), config.clone(), event_sender);
    let app = build_router(state).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    match allowed_origins {
        Some(origins) if !origins.trim().is_empty() => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| {
                    let o = o.trim();
                    match o.parse::<HeaderValue>() {
                        Ok(v) => Some(v),
                        Err(_) => {
                            warn!(origin = o, "Ignoring unparsable CORS origin");
                            None
                        }
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(methods)
                .allow_headers(Any)
        }
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install ctrl-c handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
