//! Error types for the command gateway.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the shape `{"error": <message>, "status": <code>}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dispatch_core::DispatchError;
use tracing::error;

/// Errors that can occur in the command gateway.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A store or coordinator operation failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The request body was not valid JSON for the endpoint.
    #[error("malformed request body: {0}")]
    Body(#[from] JsonRejection),

    /// A query or path parameter could not be parsed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No route matched the request.
    #[error("Route not found")]
    RouteNotFound,

    /// An unexpected failure. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Dispatch(err) => match err {
                DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
                DispatchError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                DispatchError::NoVehicleAvailable { .. } => StatusCode::CONFLICT,
                DispatchError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Body(_) | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Dispatch(err @ DispatchError::NoVehicleAvailable { .. }) => {
                format!("{err}, please try again later")
            }
            Self::Dispatch(err) => err.to_string(),
            Self::Body(rejection) => rejection.body_text(),
            Self::InvalidParameter(msg) => msg.clone(),
            Self::RouteNotFound => String::from("Route not found"),
            Self::Internal(_) => String::from("Internal server error"),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("response serialization failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "request failed with internal error");
        }

        let status = self.status();
        let body = serde_json::json!({
            "error": self.message(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
