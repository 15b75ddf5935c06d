//! Rutas HTTP
//!
//! Ensambla los routers por recurso, health y métricas.

pub mod registration_routes;
pub mod transfer_routes;
pub mod vehicle_routes;

use axum::{http::header, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::cors_layer;
use crate::services::metrics;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/api/registration-requests", registration_routes::create_registration_router())
        .nest("/api/vehicle-transfers", transfer_routes::create_transfer_router())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "vehicle-registry",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
