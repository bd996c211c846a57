//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::users::store::StoreError;

/// 核心错误类型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    InternalServerError(String),
}

/// 错误响应结构
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    pub request_id: String,
    pub timestamp: String,
}

impl CoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "BAD_REQUEST",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            CoreError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(msg) => CoreError::Conflict(msg),
            StoreError::Unavailable(msg) => CoreError::ServiceUnavailable(msg),
            StoreError::Backend(msg) => CoreError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_response = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            code: status.as_u16(),
            request_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, axum::Json(error_response)).into_response()
    }
}
