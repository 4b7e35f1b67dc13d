use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use topology_engine::TopologyError;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("Bad Request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status and the stable code reported in the envelope
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Topology(err) => {
                let status = match err {
                    TopologyError::TopologyNotFound(_)
                    | TopologyError::NodeNotFound { .. }
                    | TopologyError::LinkNotFound { .. }
                    | TopologyError::GroupNotFound { .. }
                    | TopologyError::VersionNotFound { .. } => StatusCode::NOT_FOUND,
                    TopologyError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    TopologyError::StaleVersion { .. } | TopologyError::Conflict(_) => StatusCode::CONFLICT,
                    TopologyError::Validation(_) => StatusCode::BAD_REQUEST,
                    TopologyError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                    TopologyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code) = self.status_and_code();
        let error_message = match &self {
            ApiError::Topology(err) => err.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        };

        if status_code.is_server_error() {
            tracing::error!(code = error_code, "{}", error_message);
        } else if status_code == StatusCode::CONFLICT {
            tracing::warn!(code = error_code, "{}", error_message);
        } else {
            tracing::debug!(code = error_code, "{}", error_message);
        }

        let response = ApiResponse::<()>::error_with_code(error_code, &error_message);
        (status_code, Json(response)).into_response()
    }
}

/// `Json` extractor whose rejections use the API envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `Path` extractor whose rejections use the API envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// `Query` extractor whose rejections use the API envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
