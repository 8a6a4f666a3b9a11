pub mod common;
pub mod health;
pub mod inventory;
pub mod locations;
pub mod outbound;
pub mod putaway;
pub mod receiving;

use std::time::Duration;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Versioned API routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(locations::locations_routes())
        .merge(inventory::inventory_routes())
        .merge(outbound::outbound_routes())
        .merge(receiving::receiving_routes())
        .merge(putaway::putaway_routes())
}

/// Full application router with state, CORS, timeouts and request tracing attached
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(health::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        // Every response carries the request id it was served under
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        info!("No CORS origins configured; using permissive CORS");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
