//! Session listing and per-session statistics.

use std::sync::Arc;

use super::{
    FileOnDisk, FileOnTorrent, ServiceError, TorrentList, TorrentService, TorrentStats,
    TorrentStatsFiles, parse_info_hash, stream_url,
};
use crate::torrent::TorrentHandle;

/// Snapshot of one session. A session still waiting for metadata reports
/// no files.
pub fn summarize(handle: &Arc<dyn TorrentHandle>) -> TorrentStats {
    let info_hash = handle.info_hash();
    let peers = handle.peer_stats();
    let mut files = TorrentStatsFiles::default();

    for file in handle.files() {
        if file.is_on_disk() {
            files.on_disk.push(FileOnDisk {
                file_name: file.display_path.clone(),
                stream_url: stream_url(&info_hash, &file.display_path),
                bytes_downloaded: file.bytes_completed,
                file_size_bytes: file.length,
            });
        }
        files.on_torrent.push(FileOnTorrent {
            file_name: file.display_path,
            file_size_bytes: file.length,
        });
    }

    TorrentStats {
        info_hash,
        name: handle.name(),
        total_peers: peers.total,
        active_peers: peers.active,
        pending_peers: peers.pending,
        half_open_peers: peers.half_open,
        files,
    }
}

impl TorrentService {
    /// Lists every live session, or just the one named by `info_hash`.
    ///
    /// An empty registry yields an empty list; callers decide how to
    /// present that.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - Filter is malformed
    /// - `ServiceError::TorrentNotFound` - Filter names no live session
    pub fn list_torrents(&self, info_hash: Option<&str>) -> Result<TorrentList, ServiceError> {
        let torrents = match info_hash.filter(|raw| !raw.is_empty()) {
            Some(raw) => vec![self.torrent_stats(raw)?],
            None => self.engine.torrents().iter().map(summarize).collect(),
        };
        Ok(TorrentList { torrents })
    }

    /// Statistics for one session.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - Identifier missing or malformed
    /// - `ServiceError::TorrentNotFound` - No live session with that identifier
    pub fn torrent_stats(&self, info_hash: &str) -> Result<TorrentStats, ServiceError> {
        if info_hash.is_empty() {
            return Err(ServiceError::validation("InfoHash is not provided"));
        }
        let info_hash = parse_info_hash(info_hash)?;
        let handle = self
            .engine
            .torrent(&info_hash)
            .ok_or(ServiceError::TorrentNotFound { info_hash })?;
        Ok(summarize(&handle))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::super::tests::{HEX, seed_show, service};
    use super::*;
    use crate::service::ErrorKind;
    use crate::torrent::InfoHash;
    use crate::torrent::test_mocks::{MockEngine, MockFile};

    #[test]
    fn test_empty_registry_lists_nothing() {
        let engine = Arc::new(MockEngine::new());
        let service = service(&engine, Path::new("/tmp/unused"));

        let list = service.list_torrents(None).unwrap();
        assert!(list.torrents.is_empty());
    }

    #[test]
    fn test_stats_split_on_disk_files() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = InfoHash::from_hex(HEX).unwrap();
        engine.seed(
            info_hash,
            "Album",
            vec![
                MockFile::complete("Album/01.flac", b"track one"),
                MockFile::empty("Album/02.flac", b"track two"),
            ],
        );
        let service = service(&engine, Path::new("/tmp/unused"));

        let stats = service.torrent_stats(HEX).unwrap();
        assert_eq!(stats.name, "Album");
        assert_eq!(stats.total_peers, 4);
        assert_eq!(stats.active_peers, 2);
        assert_eq!(stats.files.on_torrent.len(), 2);
        assert_eq!(stats.files.on_disk.len(), 1);

        let on_disk = &stats.files.on_disk[0];
        assert_eq!(on_disk.file_name, "Album/01.flac");
        assert_eq!(on_disk.bytes_downloaded, 9);
        assert_eq!(
            on_disk.stream_url,
            format!("/api/stream?infohash={HEX}&file=Album%2F01.flac")
        );
    }

    #[test]
    fn test_pending_session_reports_no_files() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = InfoHash::from_hex(HEX).unwrap();
        engine.seed_with(info_hash, "pending", vec![MockFile::empty("a", b"a")], false);
        let service = service(&engine, Path::new("/tmp/unused"));

        let list = service.list_torrents(None).unwrap();
        assert_eq!(list.torrents.len(), 1);
        assert!(list.torrents[0].files.on_torrent.is_empty());
    }

    #[test]
    fn test_filtered_list_and_errors() {
        let engine = Arc::new(MockEngine::new());
        seed_show(&engine);
        let service = service(&engine, Path::new("/tmp/unused"));

        assert_eq!(service.list_torrents(Some(HEX)).unwrap().torrents.len(), 1);

        let invalid = service.list_torrents(Some("nothex")).err().unwrap();
        assert_eq!(invalid.kind(), ErrorKind::Validation);

        let unknown = service.list_torrents(Some(&"ee".repeat(20))).err().unwrap();
        assert_eq!(unknown.kind(), ErrorKind::NotFound);

        let missing = service.torrent_stats("").err().unwrap();
        assert_eq!(missing.to_string(), "InfoHash is not provided");
    }
}
