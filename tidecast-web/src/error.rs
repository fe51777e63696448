//! Error and JSON response encoding.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tidecast_core::{ErrorKind, ServiceError};

/// Body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// HTTP status for an orchestrator error.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Engine | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Renders `{"Error": message}`, falling back to plain text if encoding fails.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    match serde_json::to_vec(&ErrorBody { error: message }) {
        Ok(body) => json_bytes(status, body),
        Err(err) => {
            tracing::error!("Failed to encode error body: {}", err);
            plain_text(status, message)
        }
    }
}

/// Renders `value` as JSON with `status`.
///
/// An encoding failure degrades to a 500 error response instead of a
/// truncated body.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => json_bytes(status, body),
        Err(err) => {
            tracing::error!("Failed to encode response body: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Response JSON body encode error",
            )
        }
    }
}

fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], Body::from(body)).into_response()
}

fn plain_text(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.to_string(),
    )
        .into_response()
}

/// Handler error wrapper carrying an orchestrator failure.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn validation(message: &str) -> Self {
        Self(ServiceError::Validation {
            message: message.to_string(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        error_response(status, &self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use tidecast_core::InfoHash;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Engine), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::Io), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_api_error_body() {
        let response = ApiError(ServiceError::TorrentNotFound {
            info_hash: InfoHash::new([1; 20]),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"Error":"Torrent not found"}"#);
    }
}
