use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use zapscan_core::error::CoreError;

use crate::pages;

/// 页面处理器的统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scanner engine error: {0}")]
    Engine(String),

    #[error("Scanner engine timed out: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Http(_) | CoreError::Engine { .. } | CoreError::Parse(_) => {
                AppError::Engine(err.to_string())
            }
            CoreError::Timeout(_) => AppError::Timeout(err.to_string()),
            CoreError::InvalidReportName(name) => {
                AppError::BadRequest(format!("invalid report name `{}`", name))
            }
            CoreError::NotFound(name) => AppError::NotFound(format!("report `{}`", name)),
            CoreError::Io(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Engine(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(pages::error_page(status, &self.to_string()))
    }
}
