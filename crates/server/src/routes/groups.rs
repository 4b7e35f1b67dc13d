use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{post, put},
};
use serde::Deserialize;
use topology_engine::{GroupId, NewGroup, TopologyGroup, TopologyId, UpdateGroup};
use utils::response::ApiResponse;

use super::{Precondition, TopologyPath};
use crate::{
    AppState,
    error::{ApiError, AppJson, AppPath, AppQuery},
};

#[derive(Debug, Deserialize)]
struct GroupPath {
    id: u64,
    gid: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topologies/{id}/groups", post(add_group))
        .route("/topologies/{id}/groups/{gid}", put(update_group).delete(delete_group))
}

async fn add_group(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppQuery(precondition): AppQuery<Precondition>,
    AppJson(payload): AppJson<NewGroup>,
) -> Result<(StatusCode, Json<ApiResponse<TopologyGroup>>), ApiError> {
    let group = state
        .service
        .add_group(TopologyId(id), payload, precondition.expected_version)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(group))))
}

async fn update_group(
    State(state): State<AppState>,
    AppPath(GroupPath { id, gid }): AppPath<GroupPath>,
    AppQuery(precondition): AppQuery<Precondition>,
    AppJson(payload): AppJson<UpdateGroup>,
) -> Result<Json<ApiResponse<TopologyGroup>>, ApiError> {
    let group = state
        .service
        .update_group(TopologyId(id), GroupId(gid), payload, precondition.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(group)))
}

async fn delete_group(
    State(state): State<AppState>,
    AppPath(GroupPath { id, gid }): AppPath<GroupPath>,
    AppQuery(precondition): AppQuery<Precondition>,
) -> Result<Json<ApiResponse<TopologyGroup>>, ApiError> {
    let group = state
        .service
        .delete_group(TopologyId(id), GroupId(gid), precondition.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(group)))
}
