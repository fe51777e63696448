//! Session registration, selection and stats over the JSON API.

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{TestServer, clip_bytes};

#[tokio::test]
async fn test_add_magnet_all_files_single_file() {
    let server = TestServer::new();
    let hex = server.clip.info_hash.to_hex();

    let added = server.add_all(&server.clip).await;

    assert_eq!(added["InfoHash"], hex);
    assert_eq!(added["Name"], "clip.mp4");
    assert_eq!(added["PlaylistURL"], format!("/api/play?infohash={hex}"));
    let files = added["Files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["FileName"], "clip.mp4");
    assert_eq!(files[0]["FileSizeBytes"], clip_bytes().len());
    assert_eq!(
        files[0]["StreamURL"],
        format!("/api/stream?infohash={hex}&file=clip.mp4")
    );
}

#[tokio::test]
async fn test_add_magnet_without_selection_only_lists() {
    let server = TestServer::new();
    let response = server
        .post_json("/api/addmagnet", json!({"Magnet": server.show.magnet_link()}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert!(body.get("PlaylistURL").is_none());
    let files = body["Files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|file| file.get("StreamURL").is_none()));

    let torrent = server.engine.sim_torrent(&server.show.info_hash).unwrap();
    assert!(torrent.file_progress().iter().all(|file| !file.is_wanted()));
}

#[tokio::test]
async fn test_add_magnet_with_selectors_queues_matches() {
    let server = TestServer::new();
    let hex = server.show.info_hash.to_hex();
    let response = server
        .post_json(
            "/api/addmagnet",
            json!({"Magnet": server.show.magnet_link(), "Files": ["episode 02", "missing"]}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let files = body["Files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["FileName"], "Episode 02.mkv");
    assert_eq!(
        body["PlaylistURL"],
        format!("/api/play?infohash={hex}&file=Episode%2002.mkv")
    );

    let torrent = server.engine.sim_torrent(&server.show.info_hash).unwrap();
    let wanted: Vec<bool> = torrent
        .file_progress()
        .iter()
        .map(|file| file.is_wanted())
        .collect();
    assert_eq!(wanted, vec![false, true, false]);
}

#[tokio::test]
async fn test_add_magnet_rejects_missing_and_malformed() {
    let server = TestServer::new();

    let missing = server.post_json("/api/addmagnet", json!({})).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json(), json!({"Error": "Magnet is not provided"}));

    let malformed = server
        .post_json("/api/addmagnet", json!({"Magnet": "magnet:?dn=nothing"}))
        .await;
    assert_eq!(malformed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(malformed.json()["Error"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_not_found() {
    let server = TestServer::new();
    let request = axum::http::Request::post("/api/removetorrent")
        .body(axum::body::Body::from("[1, 2"))
        .unwrap();
    let response = server.send(request).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), json!({"Error": "Request JSON body decode error"}));
}

#[tokio::test]
async fn test_select_file_on_registered_session() {
    let server = TestServer::new();
    let hex = server.show.info_hash.to_hex();
    server
        .post_json("/api/addmagnet", json!({"Magnet": server.show.magnet_link()}))
        .await;

    let response = server
        .post_json(
            "/api/selectfile",
            json!({"InfoHash": hex, "Files": ["EPISODE 01", "nothing here"]}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "InfoHash": hex,
            "AllFiles": false,
            "Files": ["Episode 01.mkv"],
            "StreamURL": [format!("/api/stream?infohash={hex}&file=Episode%2001.mkv")],
            "PlaylistURL": format!("/api/play?infohash={hex}&file=Episode%2001.mkv"),
        })
    );
}

#[tokio::test]
async fn test_select_file_errors() {
    let server = TestServer::new();

    let nothing = server
        .post_json("/api/selectfile", json!({"InfoHash": server.show.info_hash.to_hex()}))
        .await;
    assert_eq!(nothing.status, StatusCode::NOT_FOUND);
    assert_eq!(nothing.json(), json!({"Error": "InfoHash or Files is not provided"}));

    let unknown = server
        .post_json(
            "/api/selectfile",
            json!({"InfoHash": server.show.info_hash.to_hex(), "AllFiles": true}),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_torrent_list_and_stats() {
    let server = TestServer::new();

    let empty = server.get("/api/torrents").await;
    assert_eq!(empty.status, StatusCode::NOT_FOUND);
    assert_eq!(empty.json(), json!({"Torrents": []}));

    server.add_all(&server.show).await;
    let hex = server.show.info_hash.to_hex();

    let listed = server.get("/api/torrents").await;
    assert_eq!(listed.status, StatusCode::OK);
    let torrents = listed.json()["Torrents"].as_array().unwrap().clone();
    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0]["InfoHash"], hex);

    let stats = server.get(&format!("/api/torrent?infohash={hex}")).await;
    assert_eq!(stats.status, StatusCode::OK);
    let stats = stats.json();
    assert_eq!(stats["Name"], "Show");
    let on_torrent = stats["Files"]["OnTorrent"].as_array().unwrap();
    assert_eq!(on_torrent.len(), 3);
    assert_eq!(on_torrent[2]["FileName"], "notes.txt");
    assert_eq!(on_torrent[2]["FileSizeBytes"], 5);

    let missing = server.get("/api/torrent").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json(), json!({"Error": "InfoHash is not provided"}));

    let unknown = server
        .get(&format!("/api/torrent?infohash={}", "ab".repeat(20)))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}
