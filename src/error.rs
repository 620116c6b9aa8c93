use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::{response::ApiResponse, state::AppState};

const GENERIC_INTERNAL: &str = "Something went wrong";

/// Display text of an internal fault, attached to the 500 response so the
/// envelope layer can decide whether to show it.
#[derive(Debug, Clone)]
struct InternalDetail(String);

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>, errors: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation { message, errors } => {
                let errors = (!errors.is_empty()).then_some(errors);
                (status, Json(ApiResponse::<()>::failure(message, errors))).into_response()
            }
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled internal error");
                let mut res =
                    (status, Json(ApiResponse::<()>::failure(GENERIC_INTERNAL, None))).into_response();
                res.extensions_mut().insert(InternalDetail(e.to_string()));
                res
            }
            other => (status, Json(ApiResponse::<()>::failure(other.to_string(), None))).into_response(),
        }
    }
}

fn envelope(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::failure(message, None))).into_response()
}

/// Response layer: shows internal error text outside production and wraps
/// axum's bare 405 rejections in the standard envelope.
pub async fn finalize_response(State(state): State<AppState>, mut res: Response) -> Response {
    if let Some(InternalDetail(detail)) = res.extensions_mut().remove::<InternalDetail>() {
        if !state.config.environment.is_production() {
            return envelope(res.status(), detail);
        }
        return res;
    }
    if res.status() == StatusCode::METHOD_NOT_ALLOWED && !res.headers().contains_key(header::CONTENT_TYPE) {
        let allow = res.headers().get(header::ALLOW).cloned();
        let mut wrapped = envelope(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        if let Some(allow) = allow {
            wrapped.headers_mut().insert(header::ALLOW, allow);
        }
        return wrapped;
    }
    res
}

/// Fallback for paths no route matches.
pub async fn route_not_found() -> Response {
    envelope(StatusCode::NOT_FOUND, "Route not found")
}
