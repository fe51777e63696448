//! M3U playlist endpoint

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tidecast_core::service::PlayRequest;

use super::utils::{attachment, query_value, query_values, request_host, request_scheme};
use crate::error::ApiError;
use crate::server::AppState;

/// Playlist media type understood by common players.
pub const PLAYLIST_CONTENT_TYPE: &str = "audio/mpegurl";

/// Builds the play request from repeated query parameters.
pub fn play_request(query: Option<&str>) -> PlayRequest {
    PlayRequest {
        info_hash: query_value(query, "infohash"),
        magnet: query_value(query, "magnet"),
        display_names: query_values(query, "dn"),
        trackers: query_values(query, "tr"),
        files: query_values(query, "file"),
    }
}

/// `GET /api/play?infohash=|magnet=[&dn=][&tr=][&file=]*`
///
/// # Errors
/// - `ApiError` - No source or invalid identifier (404), engine failure (500)
pub async fn play(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let request = play_request(query.as_deref());
    let document = state
        .service
        .play(request, &request_scheme(&headers), &request_host(&headers))
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, attachment(&document.file_name)),
        ],
        document.body,
    )
        .into_response())
}
