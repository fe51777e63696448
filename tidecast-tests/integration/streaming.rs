//! Byte-range streaming of files that are still downloading.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use crate::common::{TestServer, clip_bytes};

fn clip_stream_uri(server: &TestServer) -> String {
    format!(
        "/api/stream?infohash={}&file=clip.mp4",
        server.clip.info_hash.to_hex()
    )
}

#[tokio::test]
async fn test_stream_whole_file_while_downloading() {
    let server = TestServer::new();
    server.add_all(&server.clip).await;

    let response = server.get(&clip_stream_uri(&server)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "video/mp4");
    assert_eq!(response.header(header::ACCEPT_RANGES), "bytes");
    assert_eq!(response.header(header::CONTENT_LENGTH), "20000");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"clip.mp4\""
    );
    assert_eq!(response.body.to_vec(), clip_bytes());
    assert!(server.data_dir.path().join("clip.mp4").is_file());
}

#[tokio::test]
async fn test_stream_range_requests() {
    let server = TestServer::new();
    server.add_all(&server.clip).await;
    let content = clip_bytes();

    let request = Request::get(clip_stream_uri(&server))
        .header(header::RANGE, "bytes=1000-1999")
        .body(Body::empty())
        .unwrap();
    let middle = server.send(request).await;
    assert_eq!(middle.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(middle.header(header::CONTENT_RANGE), "bytes 1000-1999/20000");
    assert_eq!(middle.body.to_vec(), content[1000..2000].to_vec());

    let request = Request::get(clip_stream_uri(&server))
        .header(header::RANGE, "bytes=-100")
        .body(Body::empty())
        .unwrap();
    let tail = server.send(request).await;
    assert_eq!(tail.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(tail.header(header::CONTENT_RANGE), "bytes 19900-19999/20000");
    assert_eq!(tail.body.to_vec(), content[19_900..].to_vec());

    let request = Request::get(clip_stream_uri(&server))
        .header(header::RANGE, "bytes=20000-")
        .body(Body::empty())
        .unwrap();
    let past_end = server.send(request).await;
    assert_eq!(past_end.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(past_end.header(header::CONTENT_RANGE), "bytes */20000");
}

#[tokio::test]
async fn test_stream_member_of_multi_file_torrent() {
    let server = TestServer::new();
    server.add_all(&server.show).await;
    let uri = format!(
        "/api/stream?infohash={}&file=Episode%2002.mkv",
        server.show.info_hash.to_hex()
    );

    let response = server.get(&uri).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "video/x-matroska");
    assert_eq!(response.text(), "second episode");
    assert!(server.data_dir.path().join("Show/Episode 02.mkv").is_file());
}

#[tokio::test]
async fn test_head_reports_length_without_reading() {
    let server = TestServer::new();
    server
        .post_json("/api/addmagnet", json!({"Magnet": server.clip.magnet_link()}))
        .await;

    let request = Request::builder()
        .method(Method::HEAD)
        .uri(clip_stream_uri(&server))
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_LENGTH), "20000");
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_stream_does_not_enqueue_unselected_file() {
    let server = TestServer::new();
    server
        .post_json("/api/addmagnet", json!({"Magnet": server.clip.magnet_link()}))
        .await;

    let read = tokio::time::timeout(
        Duration::from_millis(500),
        server.get(&clip_stream_uri(&server)),
    )
    .await;
    assert!(read.is_err());

    let torrent = server.engine.sim_torrent(&server.clip.info_hash).unwrap();
    let progress = torrent.file_progress();
    assert!(!progress[0].is_wanted());
    assert_eq!(progress[0].completed(), 0);
}

#[tokio::test]
async fn test_stream_lookup_failures() {
    let server = TestServer::new();
    server.add_all(&server.clip).await;
    let hex = server.clip.info_hash.to_hex();

    let missing_file = server
        .get(&format!("/api/stream?infohash={hex}&file=missing.mp4"))
        .await;
    assert_eq!(missing_file.status, StatusCode::NOT_FOUND);

    let partial_name = server
        .get(&format!("/api/stream?infohash={hex}&file=clip"))
        .await;
    assert_eq!(partial_name.status, StatusCode::NOT_FOUND);

    let no_file = server.get(&format!("/api/stream?infohash={hex}")).await;
    assert_eq!(no_file.status, StatusCode::NOT_FOUND);
    assert_eq!(no_file.json(), json!({"Error": "InfoHash or File is not provided"}));

    let bad_hash = server.get("/api/stream?infohash=xyz&file=clip.mp4").await;
    assert_eq!(bad_hash.status, StatusCode::NOT_FOUND);
    assert_eq!(bad_hash.json(), json!({"Error": "InfoHash not valid"}));
}
