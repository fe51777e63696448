//! JSON API handlers for session management

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::de::DeserializeOwned;
use tidecast_core::service::{AddMagnetRequest, RemoveTorrentsRequest, SelectFilesRequest};

use super::utils::query_value;
use crate::error::{ApiError, json_response};
use crate::server::AppState;

const BODY_DECODE_ERROR: &str = "Request JSON body decode error";

/// Decodes a JSON request body regardless of its declared content type.
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        tracing::debug!("Rejecting request body: {}", err);
        ApiError::validation(BODY_DECODE_ERROR)
    })
}

/// `POST /api/addmagnet`
///
/// # Errors
/// - `ApiError` - Missing magnet (404), engine failure (500)
pub async fn add_magnet(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: AddMagnetRequest = decode_body(&body)?;
    let response = state.service.add_magnet(request).await?;
    Ok(json_response(StatusCode::OK, &response))
}

/// `POST /api/selectfile`
///
/// # Errors
/// - `ApiError` - Missing identifier or selection (404), unknown session (404)
pub async fn select_file(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: SelectFilesRequest = decode_body(&body)?;
    let response = state.service.select_files(request).await?;
    Ok(json_response(StatusCode::OK, &response))
}

/// `POST /api/removetorrent`
///
/// Per-identifier failures are reported inline; only an empty request fails.
///
/// # Errors
/// - `ApiError` - No identifiers given (404)
pub async fn remove_torrent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: RemoveTorrentsRequest = decode_body(&body)?;
    let response = state.service.remove_torrents(request).await?;
    Ok(json_response(StatusCode::OK, &response))
}

/// `GET /api/torrents`
///
/// An empty registry answers 404 with an empty list.
///
/// # Errors
/// - `ApiError` - Invalid or unknown filter (404)
pub async fn list_torrents(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let filter = query_value(query.as_deref(), "infohash");
    let list = state.service.list_torrents(filter.as_deref())?;
    let status = if list.torrents.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok(json_response(status, &list))
}

/// `GET /api/torrent`
///
/// # Errors
/// - `ApiError` - Missing, invalid or unknown identifier (404)
pub async fn torrent_stats(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let info_hash = query_value(query.as_deref(), "infohash").unwrap_or_default();
    let stats = state.service.torrent_stats(&info_hash)?;
    Ok(json_response(StatusCode::OK, &stats))
}
