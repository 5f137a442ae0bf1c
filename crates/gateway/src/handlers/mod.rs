//! API handlers module

pub mod articles;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod health;
pub mod uploads;
pub mod users;
pub mod workflow;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use newsroom_common::errors::AppError;

/// Map a multipart read failure, keeping the body-limit case distinct
pub(crate) fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { size: limit + 1, limit }
    } else {
        AppError::validation("file", err.body_text())
    }
}
