//! Session teardown: drop from the engine, then delete materialized data.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::{
    RemoveStatus, RemoveTorrentsRequest, RemoveTorrentsResponse, RemovedTorrent, ServiceError,
    TorrentService,
};
use crate::torrent::{InfoHash, TorrentHandle};

/// Directory (or file, for single-file sessions) a session materializes into.
///
/// Returns `None` when the name is not a single plain path component, so a
/// hostile name can never point deletion outside `data_dir`.
pub fn session_data_path(data_dir: &Path, name: &str) -> Option<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Some(data_dir.join(part)),
        _ => None,
    }
}

async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match removed {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl TorrentService {
    /// Drops each named session and deletes its data.
    ///
    /// Every identifier gets its own status, in input order; one failure
    /// never aborts the rest of the batch.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - No identifiers given
    pub async fn remove_torrents(
        &self,
        request: RemoveTorrentsRequest,
    ) -> Result<RemoveTorrentsResponse, ServiceError> {
        if request.info_hash.is_empty() {
            return Err(ServiceError::validation("InfoHash is not provided"));
        }

        let mut torrents = Vec::with_capacity(request.info_hash.len());
        for raw in request.info_hash {
            let Ok(info_hash) = InfoHash::from_hex(raw.trim()) else {
                torrents.push(RemovedTorrent {
                    name: String::new(),
                    info_hash: raw,
                    status: RemoveStatus::InvalidInfoHash,
                });
                continue;
            };
            let Some(handle) = self.engine.torrent(&info_hash) else {
                torrents.push(RemovedTorrent {
                    name: String::new(),
                    info_hash: raw,
                    status: RemoveStatus::TorrentNotFound,
                });
                continue;
            };
            let (name, status) = self.teardown(&handle).await;
            torrents.push(RemovedTorrent {
                name,
                info_hash: info_hash.to_hex(),
                status,
            });
        }

        Ok(RemoveTorrentsResponse { torrents })
    }

    /// Cancels pending metadata waits, then tears down every live session.
    ///
    /// Runs sequentially; failures are logged and skipped. Returns how many
    /// sessions were torn down cleanly.
    pub async fn shutdown(&self) -> usize {
        self.shutdown.cancel();
        let sessions = self.engine.torrents();
        info!("Shutting down {} session(s)", sessions.len());

        let mut removed = 0;
        for handle in &sessions {
            if let (_, RemoveStatus::Removed) = self.teardown(handle).await {
                removed += 1;
            }
        }
        removed
    }

    async fn teardown(&self, handle: &Arc<dyn TorrentHandle>) -> (String, RemoveStatus) {
        let name = handle.name();
        let info_hash = handle.info_hash();
        let materialized = handle.has_metadata();
        handle.drop_torrent().await;

        // Without metadata the name is only a display hint and nothing was written
        if !materialized {
            info!("Removed torrent {} ({}) without data", name, info_hash);
            return (name, RemoveStatus::Removed);
        }

        let Some(path) = session_data_path(&self.data_dir, &name) else {
            warn!("Refusing to delete data for {} with unsafe name {:?}", info_hash, name);
            return (name, RemoveStatus::FileRemovalError);
        };
        if let Some(owner) = self.live_owner_of(&path, info_hash) {
            warn!(
                "Keeping {} for live torrent {} after removing {}",
                path.display(),
                owner,
                info_hash
            );
            return (name, RemoveStatus::Removed);
        }
        match remove_path(&path).await {
            Ok(()) => {
                info!("Removed torrent {} ({})", name, info_hash);
                (name, RemoveStatus::Removed)
            }
            Err(err) => {
                warn!("Failed to delete {}: {}", path.display(), err);
                (name, RemoveStatus::FileRemovalError)
            }
        }
    }

    /// Another materialized session whose data lives at `path`.
    fn live_owner_of(&self, path: &Path, removed: InfoHash) -> Option<InfoHash> {
        self.engine
            .torrents()
            .iter()
            .filter(|other| other.info_hash() != removed && other.has_metadata())
            .find(|other| {
                session_data_path(&self.data_dir, &other.name()).as_deref() == Some(path)
            })
            .map(|other| other.info_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{HEX, seed_show, service};
    use super::*;
    use crate::service::ErrorKind;
    use crate::torrent::test_mocks::{MockEngine, MockFile};

    #[test]
    fn test_session_data_path_rejects_unsafe_names() {
        let root = Path::new("/data");
        assert_eq!(
            session_data_path(root, "Movie (2020)"),
            Some(PathBuf::from("/data/Movie (2020)"))
        );
        assert!(session_data_path(root, "").is_none());
        assert!(session_data_path(root, "..").is_none());
        assert!(session_data_path(root, "a/b").is_none());
        assert!(session_data_path(root, "/etc").is_none());
    }

    #[tokio::test]
    async fn test_remove_reports_per_item_status_in_order() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = seed_show(&engine);
        let data_dir = tempfile::tempdir().unwrap();
        let show_dir = data_dir.path().join("Show");
        std::fs::create_dir_all(show_dir.join("Show")).unwrap();
        std::fs::write(show_dir.join("Show/notes.txt"), b"notes").unwrap();
        let service = service(&engine, data_dir.path());

        let unknown = "ab".repeat(20);
        let response = service
            .remove_torrents(RemoveTorrentsRequest {
                info_hash: vec!["short".to_string(), unknown.clone(), HEX.to_string()],
            })
            .await
            .unwrap();

        let statuses: Vec<RemoveStatus> = response.torrents.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                RemoveStatus::InvalidInfoHash,
                RemoveStatus::TorrentNotFound,
                RemoveStatus::Removed
            ]
        );
        assert_eq!(response.torrents[0].info_hash, "short");
        assert_eq!(response.torrents[1].info_hash, unknown);
        assert_eq!(response.torrents[2].name, "Show");

        assert!(!show_dir.exists());
        assert!(engine.mock_torrent(&info_hash).is_none());
    }

    #[tokio::test]
    async fn test_remove_never_materialized_counts_as_removed() {
        let engine = Arc::new(MockEngine::new());
        seed_show(&engine);
        let data_dir = tempfile::tempdir().unwrap();
        let service = service(&engine, data_dir.path());

        let response = service
            .remove_torrents(RemoveTorrentsRequest {
                info_hash: vec![HEX.to_string()],
            })
            .await
            .unwrap();
        assert_eq!(response.torrents[0].status, RemoveStatus::Removed);
    }

    #[tokio::test]
    async fn test_remove_pending_session_keeps_same_named_data() {
        let engine = Arc::new(MockEngine::new());
        let live = engine.seed(
            InfoHash::new([7; 20]),
            "clip.mp4",
            vec![MockFile::complete("clip.mp4", b"video")],
        );
        let pending = engine.seed_with(
            InfoHash::from_hex(HEX).unwrap(),
            "clip.mp4",
            Vec::new(),
            false,
        );
        let data_dir = tempfile::tempdir().unwrap();
        std::fs::write(data_dir.path().join("clip.mp4"), b"video").unwrap();
        let service = service(&engine, data_dir.path());

        let response = service
            .remove_torrents(RemoveTorrentsRequest {
                info_hash: vec![HEX.to_string()],
            })
            .await
            .unwrap();

        assert_eq!(response.torrents[0].status, RemoveStatus::Removed);
        assert!(pending.is_dropped());
        assert!(!live.is_dropped());
        assert!(data_dir.path().join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn test_remove_keeps_data_owned_by_other_live_session() {
        let engine = Arc::new(MockEngine::new());
        let first = engine.seed(
            InfoHash::new([7; 20]),
            "Show",
            vec![MockFile::complete("Show/e01.mkv", b"one")],
        );
        engine.seed(
            InfoHash::new([8; 20]),
            "Show",
            vec![MockFile::complete("Show/e01.mkv", b"one")],
        );
        let data_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(data_dir.path().join("Show")).unwrap();
        std::fs::write(data_dir.path().join("Show/e01.mkv"), b"one").unwrap();
        let service = service(&engine, data_dir.path());

        let response = service
            .remove_torrents(RemoveTorrentsRequest {
                info_hash: vec!["07".repeat(20)],
            })
            .await
            .unwrap();
        assert_eq!(response.torrents[0].status, RemoveStatus::Removed);
        assert!(first.is_dropped());
        assert!(data_dir.path().join("Show/e01.mkv").exists());

        // The last owner takes the data with it
        assert_eq!(service.shutdown().await, 1);
        assert!(!data_dir.path().join("Show").exists());
    }

    #[tokio::test]
    async fn test_remove_unsafe_name_reports_file_error() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = InfoHash::from_hex(HEX).unwrap();
        let torrent = engine.seed(info_hash, "..", vec![MockFile::empty("x", b"x")]);
        let data_dir = tempfile::tempdir().unwrap();
        let service = service(&engine, data_dir.path());

        let response = service
            .remove_torrents(RemoveTorrentsRequest {
                info_hash: vec![HEX.to_string()],
            })
            .await
            .unwrap();
        assert_eq!(response.torrents[0].status, RemoveStatus::FileRemovalError);
        assert!(torrent.is_dropped());
        assert!(data_dir.path().exists());
    }

    #[tokio::test]
    async fn test_remove_requires_identifiers() {
        let engine = Arc::new(MockEngine::new());
        let service = service(&engine, Path::new("/tmp/unused"));

        let err = service
            .remove_torrents(RemoveTorrentsRequest::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "InfoHash is not provided");
    }

    #[tokio::test]
    async fn test_shutdown_sweeps_all_sessions() {
        let engine = Arc::new(MockEngine::new());
        seed_show(&engine);
        engine.seed(
            InfoHash::new([9; 20]),
            "single.mp4",
            vec![MockFile::complete("single.mp4", b"video")],
        );
        let data_dir = tempfile::tempdir().unwrap();
        std::fs::write(data_dir.path().join("single.mp4"), b"video").unwrap();
        let service = service(&engine, data_dir.path());
        let token = service.shutdown_token();

        assert_eq!(service.shutdown().await, 2);
        assert!(token.is_cancelled());
        assert!(service.engine().torrents().is_empty());
        assert!(!data_dir.path().join("single.mp4").exists());
    }
}
