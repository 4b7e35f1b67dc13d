use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use topology_engine::{CreateTopology, Topology, TopologyDetail, TopologyFilter, TopologyId, TopologyPage, UpdateTopology};
use utils::response::ApiResponse;

use super::TopologyPath;
use crate::{
    AppState,
    error::{ApiError, AppJson, AppPath, AppQuery},
    middleware::CallerIdentity,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topologies", get(list_topologies).post(create_topology))
        .route(
            "/topologies/{id}",
            get(get_topology).put(update_topology).delete(delete_topology),
        )
}

async fn list_topologies(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<TopologyFilter>,
) -> Result<Json<ApiResponse<TopologyPage>>, ApiError> {
    let page = state.service.list_topologies(filter).await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn get_topology(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
) -> Result<Json<ApiResponse<TopologyDetail>>, ApiError> {
    let detail = state.service.get_topology(TopologyId(id)).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn create_topology(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    AppJson(payload): AppJson<CreateTopology>,
) -> Result<(StatusCode, Json<ApiResponse<Topology>>), ApiError> {
    let topology = state.service.create_topology(payload, caller.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(topology))))
}

async fn update_topology(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    AppJson(payload): AppJson<UpdateTopology>,
) -> Result<Json<ApiResponse<Topology>>, ApiError> {
    let topology = state.service.update_topology(TopologyId(id), payload).await?;
    Ok(Json(ApiResponse::success(topology)))
}

async fn delete_topology(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.service.delete_topology(TopologyId(id)).await?;
    Ok(Json(ApiResponse::success(())))
}
