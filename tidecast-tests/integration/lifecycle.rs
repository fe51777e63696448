//! Playlists, removal and the shutdown sweep.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tidecast_core::torrent::TorrentEngine;

use crate::common::{TestServer, clip_bytes};

#[tokio::test]
async fn test_play_builds_playlist_and_queues_matches() {
    let server = TestServer::new();
    let hex = server.show.info_hash.to_hex();
    let uri = format!(
        "/api/play?magnet={}&file=episode%2002",
        urlencoding::encode(&server.show.magnet_link())
    );
    let request = Request::get(uri)
        .header(header::HOST, "media.local:1010")
        .body(Body::empty())
        .unwrap();

    let response = server.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "audio/mpegurl");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        format!("attachment; filename=\"{hex}.m3u\"")
    );
    assert_eq!(
        response.text(),
        format!(
            "#EXTM3U\n#EXTINF:-1,Episode 02.mkv\nhttp://media.local:1010/api/stream?infohash={hex}&file=Episode%2002.mkv\n"
        )
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
async fn test_play_by_identifier_lists_every_file() {
    let server = TestServer::new();
    server
        .post_json("/api/addmagnet", json!({"Magnet": server.show.magnet_link()}))
        .await;
    let hex = server.show.info_hash.to_hex();

    let response = server.get(&format!("/api/play?infohash={hex}")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.text();
    assert!(body.starts_with("#EXTM3U\n"));
    assert_eq!(body.matches("#EXTINF:-1,").count(), 3);
    assert!(body.contains("http://localhost/api/stream?infohash="));

    let torrent = server.engine.sim_torrent(&server.show.info_hash).unwrap();
    assert!(torrent.file_progress().iter().all(|file| file.is_wanted()));
}

#[tokio::test]
async fn test_play_requires_a_source() {
    let server = TestServer::new();

    let response = server.get("/api/play").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.json(),
        json!({"Error": "InfoHash or Magnet is not provided"})
    );

    let unknown = server
        .get(&format!("/api/play?infohash={}", "cd".repeat(20)))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_reports_status_per_identifier() {
    let server = TestServer::new();
    server.add_all(&server.clip).await;
    server.add_all(&server.show).await;
    let clip_hex = server.clip.info_hash.to_hex();

    // Materialize the clip on disk before tearing it down
    let stream = server
        .get(&format!("/api/stream?infohash={clip_hex}&file=clip.mp4"))
        .await;
    assert_eq!(stream.body.len(), clip_bytes().len());
    let clip_path = server.data_dir.path().join("clip.mp4");
    assert!(clip_path.is_file());

    let unknown = "ef".repeat(20);
    let response = server
        .post_json(
            "/api/removetorrent",
            json!({"InfoHash": [clip_hex, "short", unknown]}),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"Torrents": [
            {"Name": "clip.mp4", "InfoHash": clip_hex, "Status": "REMOVED"},
            {"Name": "", "InfoHash": "short", "Status": "INVALIDINFOHASH"},
            {"Name": "", "InfoHash": unknown, "Status": "TORRENTNOTFOUND"},
        ]})
    );
    assert!(!clip_path.exists());

    // The other session is untouched
    let listed = server.get("/api/torrents").await;
    assert_eq!(listed.status, StatusCode::OK);
    let torrents = listed.json()["Torrents"].as_array().unwrap().clone();
    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0]["Name"], "Show");
}

#[tokio::test]
async fn test_remove_session_without_data_on_disk() {
    let server = TestServer::new();
    server
        .post_json("/api/addmagnet", json!({"Magnet": server.show.magnet_link()}))
        .await;
    let hex = server.show.info_hash.to_hex();

    let response = server
        .post_json("/api/removetorrent", json!({"InfoHash": [hex]}))
        .await;

    assert_eq!(response.json()["Torrents"][0]["Status"], "REMOVED");
    assert!(server.engine.sim_torrent(&server.show.info_hash).is_none());

    let empty = server
        .post_json("/api/removetorrent", json!({"InfoHash": []}))
        .await;
    assert_eq!(empty.status, StatusCode::NOT_FOUND);
    assert_eq!(empty.json(), json!({"Error": "InfoHash is not provided"}));
}

#[tokio::test]
async fn test_shutdown_unblocks_metadata_waits() {
    let server = TestServer::new();
    let orphan = format!("magnet:?xt=urn:btih:{}&dn=orphan", "12".repeat(20));
    let uri = format!("/api/play?magnet={}", urlencoding::encode(&orphan));

    let pending = {
        let router = server.router.clone();
        tokio::spawn(async move {
            use tower::ServiceExt;
            router
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pending.is_finished());

    server.service.shutdown_token().cancel();
    let response = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_shutdown_sweeps_every_session() {
    let server = TestServer::new();
    server.add_all(&server.clip).await;
    server.add_all(&server.show).await;
    let stream = server
        .get(&format!(
            "/api/stream?infohash={}&file=clip.mp4",
            server.clip.info_hash.to_hex()
        ))
        .await;
    assert_eq!(stream.status, StatusCode::OK);

    let removed = server.service.shutdown().await;

    assert_eq!(removed, 2);
    assert!(server.engine.sim_torrent(&server.clip.info_hash).is_none());
    assert!(!server.data_dir.path().join("clip.mp4").exists());
    assert!(!server.data_dir.path().join("Show").exists());
}

#[tokio::test]
async fn test_remove_pending_session_spares_live_data_with_same_name() {
    let server = TestServer::new();
    server.add_all(&server.clip).await;
    let clip_uri = format!(
        "/api/stream?infohash={}&file=clip.mp4",
        server.clip.info_hash.to_hex()
    );
    assert_eq!(server.get(&clip_uri).await.status, StatusCode::OK);
    let clip_path = server.data_dir.path().join("clip.mp4");
    assert!(clip_path.is_file());

    let impostor = "ab".repeat(20);
    // Never gets metadata, so its name is only the display hint
    server
        .engine
        .add_magnet(&format!("magnet:?xt=urn:btih:{impostor}&dn=clip.mp4"))
        .await
        .unwrap();

    let response = server
        .post_json("/api/removetorrent", json!({"InfoHash": [impostor]}))
        .await;
    assert_eq!(
        response.json(),
        json!({"Torrents": [{"Name": "clip.mp4", "InfoHash": impostor, "Status": "REMOVED"}]})
    );

    assert!(server.engine.sim_torrent(&server.clip.info_hash).is_some());
    assert!(clip_path.is_file());
    let stream = server.get(&clip_uri).await;
    assert_eq!(stream.status, StatusCode::OK);
    assert_eq!(&stream.body[..], &clip_bytes()[..]);
}
