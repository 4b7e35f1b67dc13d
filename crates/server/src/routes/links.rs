use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, patch, post},
};
use serde::Deserialize;
use topology_engine::{LinkId, LinkStatusUpdate, NewLink, TopologyId, TopologyLink};
use utils::response::ApiResponse;

use super::{Precondition, TopologyPath};
use crate::{
    AppState,
    error::{ApiError, AppJson, AppPath, AppQuery},
};

#[derive(Debug, Deserialize)]
struct LinkPath {
    id: u64,
    lid: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topologies/{id}/links", post(add_link))
        .route("/topologies/{id}/links/{lid}", delete(delete_link))
        .route("/topologies/{id}/links/{lid}/status", patch(update_link_status))
}

async fn add_link(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppQuery(precondition): AppQuery<Precondition>,
    AppJson(payload): AppJson<NewLink>,
) -> Result<(StatusCode, Json<ApiResponse<TopologyLink>>), ApiError> {
    let link = state
        .service
        .add_link(TopologyId(id), payload, precondition.expected_version)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(link))))
}

async fn update_link_status(
    State(state): State<AppState>,
    AppPath(LinkPath { id, lid }): AppPath<LinkPath>,
    AppJson(payload): AppJson<LinkStatusUpdate>,
) -> Result<Json<ApiResponse<TopologyLink>>, ApiError> {
    let link = state
        .service
        .update_link_status(TopologyId(id), LinkId(lid), payload)
        .await?;
    Ok(Json(ApiResponse::success(link)))
}

async fn delete_link(
    State(state): State<AppState>,
    AppPath(LinkPath { id, lid }): AppPath<LinkPath>,
    AppQuery(precondition): AppQuery<Precondition>,
) -> Result<Json<ApiResponse<TopologyLink>>, ApiError> {
    let link = state
        .service
        .delete_link(TopologyId(id), LinkId(lid), precondition.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(link)))
}
