pub mod asr_backend;
pub mod error;
pub mod routes;
pub mod state;

use axum::{Router, routing::get};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ingest", get(routes::ingress::ws_upgrade))
        .route("/enrichment/{segment_id}", get(routes::enrichment::get_enrichment))
        .route("/audit/trail/{segment_id}", get(routes::audit::get_trail))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
