use axum::{Json, Router, middleware, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, middleware as app_middleware};

pub mod analysis;
pub mod groups;
pub mod layout;
pub mod links;
pub mod nodes;
pub mod topologies;
pub mod versions;

/// Optimistic-concurrency token accepted by structural mutations
#[derive(Debug, Default, Deserialize)]
pub struct Precondition {
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopologyPath {
    pub id: u64,
}

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

async fn health_check() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    }))
}

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(topologies::router())
        .merge(nodes::router())
        .merge(links::router())
        .merge(groups::router())
        .merge(layout::router())
        .merge(analysis::router())
        .merge(versions::router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/v1", v1)
        .layer(middleware::from_fn(app_middleware::caller_middleware))
        .layer(middleware::from_fn(app_middleware::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
