//! Mapping from domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use vidrelay_common::Error;

/// An error as returned to API clients.
#[derive(Debug)]
pub enum ApiError {
    /// No identity on the request.
    Unauthorized,
    /// Identity present but not allowed here.
    Forbidden,
    /// A domain error from the hub.
    Domain(Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    unsupported: bool,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Domain(Error::Validation(message.into()))
    }

    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Domain(err) => match err {
                Error::Validation(_)
                | Error::UnknownProvider(_)
                | Error::MalformedCredential(_)
                | Error::Unsupported(_) => StatusCode::BAD_REQUEST,
                Error::CredentialMissing(_) => StatusCode::UNAUTHORIZED,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::UpstreamTransport(_) | Error::UpstreamLogical(_) => StatusCode::BAD_GATEWAY,
                Error::Storage(_) | Error::Io(_) | Error::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Forbidden => "Forbidden".to_string(),
            // Validation messages are shown without the "Invalid input" prefix.
            ApiError::Domain(Error::Validation(msg)) => msg.clone(),
            ApiError::Domain(Error::UnknownProvider(name)) => format!("Invalid provider: {}", name),
            ApiError::Domain(err) => err.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!("Request failed: {}", self.message());
        }
        let body = ErrorBody {
            success: false,
            error: self.message(),
            unsupported: matches!(self, ApiError::Domain(Error::Unsupported(_))),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
