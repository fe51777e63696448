//! Request and result records exchanged with the HTTP surface.
//!
//! Field names follow the JSON wire format, which uses PascalCase keys.

use serde::{Deserialize, Serialize};

use crate::torrent::InfoHash;

/// `POST /api/addmagnet` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddMagnetRequest {
    pub magnet: String,
    pub all_files: bool,
    pub files: Vec<String>,
}

/// Result of registering a magnet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddMagnetResponse {
    pub info_hash: InfoHash,
    pub name: String,
    #[serde(rename = "PlaylistURL", skip_serializing_if = "Option::is_none")]
    pub playlist_url: Option<String>,
    pub files: Vec<AddedFile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddedFile {
    pub file_name: String,
    #[serde(rename = "StreamURL", skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    pub file_size_bytes: u64,
}

/// `POST /api/selectfile` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SelectFilesRequest {
    pub info_hash: String,
    pub files: Vec<String>,
    pub all_files: bool,
}

/// Acknowledgement that files were queued for download.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectFilesResponse {
    pub info_hash: InfoHash,
    pub all_files: bool,
    pub files: Vec<String>,
    #[serde(rename = "StreamURL")]
    pub stream_urls: Vec<String>,
    #[serde(rename = "PlaylistURL", skip_serializing_if = "Option::is_none")]
    pub playlist_url: Option<String>,
}

/// `POST /api/removetorrent` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoveTorrentsRequest {
    pub info_hash: Vec<String>,
}

/// Per-identifier outcome of a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoveStatus {
    Removed,
    InvalidInfoHash,
    TorrentNotFound,
    FileRemovalError,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemovedTorrent {
    pub name: String,
    pub info_hash: String,
    pub status: RemoveStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveTorrentsResponse {
    pub torrents: Vec<RemovedTorrent>,
}

/// Summary statistics for one session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TorrentStats {
    pub info_hash: InfoHash,
    pub name: String,
    pub total_peers: usize,
    pub active_peers: usize,
    pub pending_peers: usize,
    pub half_open_peers: usize,
    pub files: TorrentStatsFiles,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TorrentStatsFiles {
    pub on_torrent: Vec<FileOnTorrent>,
    pub on_disk: Vec<FileOnDisk>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileOnTorrent {
    pub file_name: String,
    pub file_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileOnDisk {
    pub file_name: String,
    #[serde(rename = "StreamURL")]
    pub stream_url: String,
    pub bytes_downloaded: u64,
    pub file_size_bytes: u64,
}

/// `GET /api/torrents` result.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TorrentList {
    pub torrents: Vec<TorrentStats>,
}

/// How `play` locates its session.
#[derive(Debug, Clone, Default)]
pub struct PlayRequest {
    pub info_hash: Option<String>,
    pub magnet: Option<String>,
    pub display_names: Vec<String>,
    pub trackers: Vec<String>,
    pub files: Vec<String>,
}

/// Rendered playlist plus its suggested attachment name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDocument {
    pub file_name: String,
    pub body: String,
    pub entries: usize,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_remove_status_wire_names() {
        let statuses = [
            RemoveStatus::Removed,
            RemoveStatus::InvalidInfoHash,
            RemoveStatus::TorrentNotFound,
            RemoveStatus::FileRemovalError,
        ];
        let encoded = serde_json::to_value(statuses).unwrap();
        assert_eq!(
            encoded,
            json!(["REMOVED", "INVALIDINFOHASH", "TORRENTNOTFOUND", "FILEREMOVALERROR"])
        );
    }

    #[test]
    fn test_add_magnet_request_defaults() {
        let request: AddMagnetRequest = serde_json::from_str(r#"{"Magnet":"magnet:?x"}"#).unwrap();
        assert_eq!(request.magnet, "magnet:?x");
        assert!(!request.all_files);
        assert!(request.files.is_empty());
    }

    #[test]
    fn test_add_magnet_response_keys() {
        let response = AddMagnetResponse {
            info_hash: InfoHash::new([0; 20]),
            name: "movie".to_string(),
            playlist_url: None,
            files: vec![AddedFile {
                file_name: "movie.mp4".to_string(),
                stream_url: Some("/api/stream?x".to_string()),
                file_size_bytes: 42,
            }],
        };
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(
            encoded,
            json!({
                "InfoHash": "0".repeat(40),
                "Name": "movie",
                "Files": [{
                    "FileName": "movie.mp4",
                    "StreamURL": "/api/stream?x",
                    "FileSizeBytes": 42
                }]
            })
        );
    }
}
