use axum::{Json, Router, extract::State, routing::post};
use topology_engine::{ImpactReport, ImpactRequest, PathAnalysis, PathRequest, TopologyId};
use utils::response::ApiResponse;

use super::TopologyPath;
use crate::{
    AppState,
    error::{ApiError, AppJson, AppPath},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topologies/{id}/analyze/path", post(analyze_path))
        .route("/topologies/{id}/analyze/impact", post(analyze_impact))
}

async fn analyze_path(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppJson(payload): AppJson<PathRequest>,
) -> Result<Json<ApiResponse<PathAnalysis>>, ApiError> {
    let analysis = state.service.analyze_path(TopologyId(id), payload).await?;
    Ok(Json(ApiResponse::success(analysis)))
}

async fn analyze_impact(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppJson(payload): AppJson<ImpactRequest>,
) -> Result<Json<ApiResponse<ImpactReport>>, ApiError> {
    let report = state.service.analyze_impact(TopologyId(id), payload).await?;
    Ok(Json(ApiResponse::success(report)))
}
