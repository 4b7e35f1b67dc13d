use axum::{Json, Router, extract::State, routing::post};
use topology_engine::{LayoutRequest, LayoutResult, TopologyId};
use utils::response::ApiResponse;

use super::TopologyPath;
use crate::{
    AppState,
    error::{ApiError, AppJson, AppPath},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/topologies/{id}/layout", post(apply_layout))
}

/// Runs until the layout is committed; a client disconnect drops the
/// handler future and cancels the computation.
async fn apply_layout(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppJson(payload): AppJson<LayoutRequest>,
) -> Result<Json<ApiResponse<LayoutResult>>, ApiError> {
    let result = state.service.apply_layout(TopologyId(id), payload).await?;
    Ok(Json(ApiResponse::success(result)))
}
