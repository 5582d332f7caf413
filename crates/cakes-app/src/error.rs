use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

/// Outcome of a failed use case, store faults never leave the service unclassified.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("cake data with id {0} not found")]
    NotFound(i64),

    #[error("{message}")]
    Internal {
        message: &'static str,
        detail: String,
    },
}

impl ServiceError {
    pub(crate) fn internal(message: &'static str, source: cakes_dal::Error) -> Self {
        ServiceError::Internal {
            message,
            detail: source.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorBody {
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidRequest(msg) => {
                debug!("Invalid request: {msg}");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        error_message: msg,
                        error_data: None,
                    },
                )
            }
            ApiError::Service(e @ ServiceError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error_message: e.to_string(),
                    error_data: None,
                },
            ),
            ApiError::Service(ServiceError::Internal { message, detail }) => {
                error!("{message}: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error_message: message.to_string(),
                        error_data: Some(json!({ "detail": detail })),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(format!(
            "invalid query parameter: {}",
            rejection.body_text()
        ))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Path rejected: {}", rejection.body_text());
        ApiError::InvalidRequest("invalid parameter id".to_string())
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::InvalidRequest(report.to_string().trim_end().to_string())
    }
}
