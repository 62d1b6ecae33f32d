use std::any::Any;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hackmatch_config::ConfigError;
use hackmatch_database::error::DatabaseError;
use hackmatch_workflow::WorkflowError;
use serde_json::json;
use tracing::error;
use tracing_subscriber::util::TryInitError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),
    #[error("{}", .0.body_text())]
    Query(#[from] QueryRejection),
    #[error("Not authorized to access this route")]
    MissingToken,
    #[error("{0}")]
    MalformedId(&'static str),
    #[error("Route not found")]
    RouteNotFound,
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TryInitError),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Workflow(WorkflowError::Validation(_) | WorkflowError::Conflict(_))
            | Self::Json(_)
            | Self::Query(_) => StatusCode::BAD_REQUEST,
            Self::Workflow(WorkflowError::Authentication(_)) | Self::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::Workflow(WorkflowError::Authorization(_)) => StatusCode::FORBIDDEN,
            Self::Workflow(WorkflowError::NotFound(_))
            | Self::MalformedId(_)
            | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Workflow(WorkflowError::Store(_) | WorkflowError::Credentials(_))
            | Self::File(_)
            | Self::Database(_)
            | Self::Config(_)
            | Self::Telemetry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Server error".to_owned()
        } else {
            self.to_string()
        };
        envelope(status, message)
    }
}

fn envelope(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// Handler panics still answer with the usual error envelope.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "handler panicked");
    envelope(StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_owned())
}

pub async fn route_not_found() -> AppError {
    AppError::RouteNotFound
}
