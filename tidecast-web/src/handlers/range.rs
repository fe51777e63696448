//! HTTP Range request handling for file streaming
//!
//! Implements single-range RFC 7233 requests: explicit, open-ended and
//! suffix forms. Multi-range requests are answered with their first range.

use axum::http::HeaderMap;
use axum::http::header::RANGE;

/// Outcome of evaluating a `Range` header against a resource length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: serve the whole resource with 200
    Full,
    /// Inclusive byte span to serve with 206
    Partial { start: u64, end: u64 },
    /// No overlap with the resource: answer 416
    Unsatisfiable,
}

impl ByteRange {
    /// Number of body bytes this range covers.
    pub fn content_length(&self, total_size: u64) -> u64 {
        match *self {
            ByteRange::Full => total_size,
            ByteRange::Partial { start, end } => end - start + 1,
            ByteRange::Unsatisfiable => 0,
        }
    }

    pub fn start(&self) -> u64 {
        match *self {
            ByteRange::Partial { start, .. } => start,
            _ => 0,
        }
    }
}

/// Parse an HTTP Range header value.
///
/// Syntactically invalid headers are ignored (full response), as RFC 7233
/// requires; well-formed ranges starting past the end are unsatisfiable.
///
/// # Examples
/// ```
/// use tidecast_web::handlers::range::{ByteRange, parse_range_header};
/// assert_eq!(
///     parse_range_header("bytes=100-199", 1000),
///     ByteRange::Partial { start: 100, end: 199 }
/// );
/// ```
pub fn parse_range_header(range: &str, total_size: u64) -> ByteRange {
    let Some(range_spec) = range.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    let first = range_spec.split(',').next().unwrap_or_default().trim();
    let Some((start_str, end_str)) = first.split_once('-') else {
        return ByteRange::Full;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        // Suffix form: last N bytes
        let Ok(suffix) = end_str.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || total_size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: total_size.saturating_sub(suffix),
            end: total_size - 1,
        };
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if end_str.is_empty() {
        None
    } else {
        match end_str.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= total_size {
        return ByteRange::Unsatisfiable;
    }
    let last = total_size - 1;
    ByteRange::Partial {
        start,
        end: end.map_or(last, |end| end.min(last)),
    }
}

/// Extract and parse the Range header from request headers.
pub fn extract_range(headers: &HeaderMap, total_size: u64) -> ByteRange {
    headers
        .get(RANGE)
        .and_then(|range| range.to_str().ok())
        .map_or(ByteRange::Full, |range| parse_range_header(range, total_size))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_parse_range_header_valid() {
        assert_eq!(
            parse_range_header("bytes=100-199", 1000),
            ByteRange::Partial { start: 100, end: 199 }
        );
    }

    #[test]
    fn test_parse_range_header_open_end() {
        let range = parse_range_header("bytes=500-", 1000);
        assert_eq!(range, ByteRange::Partial { start: 500, end: 999 });
        assert_eq!(range.content_length(1000), 500);
    }

    #[test]
    fn test_parse_range_header_suffix() {
        assert_eq!(
            parse_range_header("bytes=-100", 1000),
            ByteRange::Partial { start: 900, end: 999 }
        );
        assert_eq!(
            parse_range_header("bytes=-5000", 1000),
            ByteRange::Partial { start: 0, end: 999 }
        );
        assert_eq!(parse_range_header("bytes=-0", 1000), ByteRange::Unsatisfiable);
    }

    #[test]
    fn test_parse_range_header_clamps_end() {
        assert_eq!(
            parse_range_header("bytes=100-9999", 500),
            ByteRange::Partial { start: 100, end: 499 }
        );
    }

    #[test]
    fn test_parse_range_header_unsatisfiable() {
        assert_eq!(parse_range_header("bytes=500-599", 400), ByteRange::Unsatisfiable);
        assert_eq!(parse_range_header("bytes=400-", 400), ByteRange::Unsatisfiable);
        assert_eq!(parse_range_header("bytes=0-", 0), ByteRange::Unsatisfiable);
    }

    #[test]
    fn test_parse_range_header_invalid_is_ignored() {
        assert_eq!(parse_range_header("invalid", 1000), ByteRange::Full);
        assert_eq!(parse_range_header("bytes=abc-", 1000), ByteRange::Full);
        assert_eq!(parse_range_header("bytes=200-100", 1000), ByteRange::Full);
        assert_eq!(parse_range_header("items=0-1", 1000), ByteRange::Full);
    }

    #[test]
    fn test_multi_range_uses_first() {
        assert_eq!(
            parse_range_header("bytes=0-9, 20-29", 100),
            ByteRange::Partial { start: 0, end: 9 }
        );
    }

    #[test]
    fn test_extract_range_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_range(&headers, 10), ByteRange::Full);
        headers.insert(RANGE, HeaderValue::from_static("bytes=2-3"));
        assert_eq!(
            extract_range(&headers, 10),
            ByteRange::Partial { start: 2, end: 3 }
        );
    }
}
