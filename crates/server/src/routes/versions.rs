use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use topology_engine::{CreateSnapshot, RestoreOutcome, TopologyId, TopologyVersion, VersionSummary};
use utils::response::ApiResponse;

use super::{Precondition, TopologyPath};
use crate::{
    AppState,
    error::{ApiError, AppPath, AppQuery},
    middleware::CallerIdentity,
};

#[derive(Debug, Deserialize)]
struct VersionPath {
    id: u64,
    v: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/topologies/{id}/versions",
            get(list_versions).post(create_snapshot),
        )
        .route("/topologies/{id}/versions/{v}", get(get_version))
        .route("/topologies/{id}/versions/{v}/restore", post(restore_version))
}

async fn list_versions(
    State(state): State<AppState>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
) -> Result<Json<ApiResponse<Vec<VersionSummary>>>, ApiError> {
    let versions = state.service.list_versions(TopologyId(id)).await?;
    Ok(Json(ApiResponse::success(versions)))
}

async fn create_snapshot(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    AppPath(TopologyPath { id }): AppPath<TopologyPath>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<TopologyVersion>>), ApiError> {
    // the body is optional; an empty one means no description
    let request: CreateSnapshot = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSnapshot::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Failed to parse the request body as JSON: {e}")))?
    };
    let version = state
        .service
        .create_snapshot(TopologyId(id), request, caller.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(version))))
}

async fn get_version(
    State(state): State<AppState>,
    AppPath(VersionPath { id, v }): AppPath<VersionPath>,
) -> Result<Json<ApiResponse<TopologyVersion>>, ApiError> {
    let version = state.service.get_version(TopologyId(id), v).await?;
    Ok(Json(ApiResponse::success(version)))
}

async fn restore_version(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    AppPath(VersionPath { id, v }): AppPath<VersionPath>,
    AppQuery(precondition): AppQuery<Precondition>,
) -> Result<Json<ApiResponse<RestoreOutcome>>, ApiError> {
    let outcome = state
        .service
        .restore_version(TopologyId(id), v, precondition.expected_version, caller.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
