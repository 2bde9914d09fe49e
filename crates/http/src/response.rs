//! Uniform response envelope shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{status_code, description, data}` body written for successes and failures alike.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub status_code: u16,
    pub description: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            description: describe(status).to_string(),
            data,
        }
    }
}

/// Coarse description attached to a status code.
pub fn describe(status: StatusCode) -> &'static str {
    match status.as_u16() {
        0..=399 => "OK",
        400..=499 => "Bad Request",
        _ => "Internal Server Error",
    }
}

/// Successful outcome carrying a payload.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        tracing::info!(status_code = self.status.as_u16(), "request succeeded");
        (self.status, Json(Envelope::new(self.status, self.data))).into_response()
    }
}
