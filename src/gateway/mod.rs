//! Backup gateway: the HTTP front of the local store.
//!
//! Mutating endpoints are safe to retry (a repeated CREATE collapses in the
//! snapshot, the activity log keeps both events). Reads of collections that
//! were never written return empty results. Failures use the
//! `{success: false, error}` envelope and are never retried here.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{GatewayConfig, UploadLimits};
pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

pub fn build_router(state: GatewayState) -> Router {
    let body_limit = state.limits.body_limit();

    Router::new()
        .route("/health", get(handlers::healthcheck))
        .route("/backup/stats", get(handlers::store_stats))
        .route("/backup/sync/:collection", post(handlers::sync_collection))
        .route("/backup/asset/:collection/:record_id", post(handlers::upload_asset))
        .route("/backup/assets/:collection/:record_id", post(handlers::upload_assets))
        .route("/backup/read/:collection", get(handlers::read_collection))
        .route("/backup/read/:collection/:id", get(handlers::read_record))
        .route("/backup/query/:collection", post(handlers::query_collection))
        .route("/backup/history/:collection/:month", get(handlers::monthly_history))
        .route("/backup/:collection", post(handlers::backup_record))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
