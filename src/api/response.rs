use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::store::StoreError;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Order not found")]
    NotFound,

    #[error("{message}")]
    Internal { message: &'static str, #[source] source: StoreError },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl ApiError {
    pub fn internal(message: &'static str, source: StoreError) -> Self {
        Self::Internal { message, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(e) if e.is_conflict() => StatusCode::CONFLICT,
            Self::Checkout(CheckoutError::Unexpected(_)) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn details(&self) -> Option<(&'static str, Value)> {
        let Self::Checkout(e) = self else { return None };
        let detail = match e {
            CheckoutError::InvalidProductReference(lines) => ("invalidItems", json!(lines)),
            CheckoutError::ProductNotFound(ids) => ("missingProductIds", json!(ids)),
            CheckoutError::ProductUnavailable(ids) => ("inactiveProductIds", json!(ids)),
            CheckoutError::InsufficientStock(shortfalls) => ("items", json!(shortfalls)),
            _ => return None,
        };
        Some(detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal { source, .. } => tracing::error!(error = %source, "request failed"),
            Self::Checkout(CheckoutError::Unexpected(source)) => tracing::error!(error = %source, "checkout failed"),
            _ => tracing::debug!(%status, error = %self, "request rejected"),
        }

        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(self.to_string()));
        if let Some((key, value)) = self.details() {
            body.insert(key.into(), value);
        }
        (status, Json(Value::Object(body))).into_response()
    }
}

/// `{"success": true, "data": ...}`
pub fn success(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}
