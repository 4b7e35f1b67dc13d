use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{patch, post, put},
};
use serde::{Deserialize, Serialize};
use topology_engine::{
    LinkId, NewNode, NodeId, NodePositionUpdate, Position, TopologyId, TopologyNode, UpdateNode,
};
use ts_rs::TS;
use utils::response::ApiResponse;

use super::{Precondition, TopologyPath};
use crate::{
    AppState,
    error::{ApiError, AppJson, AppPath, AppQuery},
};

#[derive(Debug, Deserialize)]
struct NodePath {
    id: u64,
    nid: u64,
}

#[derive(Debug, Deserialize, TS)]
pub struct BatchPositionRequest {
    pub nodes: Vec<NodePositionUpdate>,
}

#[derive(Debug, Serialize, TS)]
pub struct BatchPositionResult {
    pub updated: usize,
}

#[derive(Debug, Serialize, TS)]
pub struct DeletedNode {
    pub node_id: NodeId,
    /// Links removed together with the node
    pub removed_link_ids: Vec<LinkId>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topologies/{id}/nodes", post(add_node))
        .route("/topologies/{id}/nodes/batch", patch(batch_update_positions))
        .route("/topologies/{id}/nodes/{nid}", put(update_node).delete(delete_node))
        .route("/topologies/{id}/nodes/{nid}/position", patch(update_position))
}

async fn add_node(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppQuery(precondition): AppQuery<Precondition>,
    AppJson(payload): AppJson<NewNode>,
) -> Result<(StatusCode, Json<ApiResponse<TopologyNode>>), ApiError> {
    let node = state
        .service
        .add_node(TopologyId(id), payload, precondition.expected_version)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(node))))
}

async fn update_node(
    State(state): State<AppState>,
    AppPath(NodePath { id, nid }): AppPath<NodePath>,
    AppJson(payload): AppJson<UpdateNode>,
) -> Result<Json<ApiResponse<TopologyNode>>, ApiError> {
    let node = state
        .service
        .update_node(TopologyId(id), NodeId(nid), payload)
        .await?;
    Ok(Json(ApiResponse::success(node)))
}

async fn update_position(
    State(state): State<AppState>,
    AppPath(NodePath { id, nid }): AppPath<NodePath>,
    AppJson(position): AppJson<Position>,
) -> Result<Json<ApiResponse<TopologyNode>>, ApiError> {
    let node = state
        .service
        .update_node_position(TopologyId(id), NodeId(nid), position)
        .await?;
    Ok(Json(ApiResponse::success(node)))
}

async fn batch_update_positions(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppJson(payload): AppJson<BatchPositionRequest>,
) -> Result<Json<ApiResponse<BatchPositionResult>>, ApiError> {
    let updated = state
        .service
        .batch_update_node_positions(TopologyId(id), &payload.nodes)
        .await?;
    Ok(Json(ApiResponse::success(BatchPositionResult { updated })))
}

async fn delete_node(
    State(state): State<AppState>,
    AppPath(NodePath { id, nid }): AppPath<NodePath>,
    AppQuery(precondition): AppQuery<Precondition>,
) -> Result<Json<ApiResponse<DeletedNode>>, ApiError> {
    let removal = state
        .service
        .delete_node(TopologyId(id), NodeId(nid), precondition.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(DeletedNode {
        node_id: removal.node.id,
        removed_link_ids: removal.removed_links.iter().map(|l| l.id).collect(),
    })))
}
