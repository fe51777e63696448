//! Byte-range streaming of one member file

use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tidecast_core::ServiceError;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::range::{ByteRange, extract_range};
use super::utils::{attachment, query_value};
use crate::error::ApiError;
use crate::server::AppState;

/// `GET /api/stream?infohash=&file=`
///
/// Serves the file while it downloads; reads past the downloaded prefix
/// wait for the engine rather than returning short. Repeated parameters
/// take their first value.
///
/// # Errors
/// - `ApiError` - Invalid identifier, unknown session or file (404)
pub async fn stream_file(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let info_hash = query_value(query.as_deref(), "infohash");
    let file = query_value(query.as_deref(), "file");
    let source = state
        .service
        .open_stream(info_hash.as_deref(), file.as_deref())
        .await?;

    let total_size = source.length();
    let content_type = mime_guess::from_path(&source.file.display_path)
        .first_or_octet_stream()
        .to_string();
    let disposition = attachment(source.disposition_name());

    let range = extract_range(&headers, total_size);
    if range == ByteRange::Unsatisfiable {
        return Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [
                (header::CONTENT_RANGE, format!("bytes */{total_size}")),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
        )
            .into_response());
    }

    let start = range.start();
    let content_length = range.content_length(total_size);
    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, content_length.to_string())
        .header(header::CONTENT_DISPOSITION, disposition);
    response = match range {
        ByteRange::Partial { start, end } => response
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{total_size}")),
        _ => response.status(StatusCode::OK),
    };

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        let mut reader = source.reader;
        if start > 0 {
            reader
                .seek(SeekFrom::Start(start))
                .await
                .map_err(ServiceError::Io)?;
        }
        Body::from_stream(ReaderStream::new(reader.take(content_length)))
    };

    response.body(body).map_err(|err| {
        ApiError(ServiceError::Io(std::io::Error::other(err.to_string())))
    })
}
