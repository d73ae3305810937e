//! services/api/src/web/response.rs
//!
//! The JSON envelope every endpoint answers with:
//! `{ success, data?, message?, error? }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::data(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }
}

/// The OpenAPI shape of [`ApiResponse`].
#[derive(Serialize, ToSchema)]
pub struct ResponseEnvelope {
    success: bool,
    #[schema(value_type = Object)]
    data: Option<serde_json::Value>,
    message: Option<String>,
    /// Present outside production only.
    error: Option<String>,
}

/// A failed request, rendered as the envelope with `success: false`.
#[derive(Debug)]
pub struct ApiRejection {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<String>,
}

impl ApiRejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
        }
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            message: Some(self.message),
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}
