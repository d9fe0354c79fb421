use apim_core::CatalogError;
use apim_sdk::{ApimError, ErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::models::ErrorResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    /// Classify a provider failure by its kind.
    ///
    /// Authorization failures answer with `unauthorized`; failures that are not
    /// the caller's fault answer with `generic` and are logged as errors.
    pub fn from_provider(err: ApimError, unauthorized: &str, generic: &str) -> Self {
        match err.kind() {
            ErrorKind::Authorization => {
                tracing::warn!(error = %err, "{}", unauthorized);
                Self::Forbidden(unauthorized.to_string())
            }
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::InvalidArgument => Self::BadRequest(err.to_string()),
            ErrorKind::Conflict => Self::Conflict(err.to_string()),
            ErrorKind::Unavailable | ErrorKind::Internal => {
                tracing::error!(error = %err, "{}", generic);
                Self::Internal(generic.to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_message(self) -> String {
        match self {
            Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err.http_status() {
            400 => Self::BadRequest(err.to_string()),
            404 => Self::NotFound(err.to_string()),
            _ => {
                tracing::error!(error = %err, "Service hash generation failed");
                Self::Internal(format!("Failed to generate MD5 Hash due to {err}"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.into_message(),
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}
