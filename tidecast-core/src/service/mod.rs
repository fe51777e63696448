//! Torrent session orchestration.
//!
//! [`TorrentService`] maps HTTP-facing operations onto sessions owned by an
//! injected [`TorrentEngine`]. It keeps no session state of its own: every
//! call resolves a transient handle from the engine's registry.

mod error;
pub mod playlist;
mod removal;
pub mod resolver;
pub mod selector;
mod stats;
mod stream;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::{ErrorKind, ServiceError};
pub use playlist::{Playlist, play_url, stream_url};
pub use resolver::{SessionQuery, SessionResolver, parse_info_hash};
pub use selector::{MatchMode, find_file, find_files};
pub use stream::StreamSource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
pub use types::*;

use crate::config::{StreamingConfig, TidecastConfig};
use crate::torrent::{TorrentEngine, TorrentFile, TorrentHandle};

/// The torrent session orchestrator.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the engine.
pub struct TorrentService {
    engine: Arc<dyn TorrentEngine>,
    resolver: SessionResolver,
    data_dir: PathBuf,
    streaming: StreamingConfig,
    shutdown: CancellationToken,
}

impl TorrentService {
    pub fn new(engine: Arc<dyn TorrentEngine>, config: &TidecastConfig) -> Self {
        let shutdown = CancellationToken::new();
        let resolver = SessionResolver::new(
            Arc::clone(&engine),
            config.streaming.metadata_timeout,
            shutdown.clone(),
        );
        Self {
            engine,
            resolver,
            data_dir: config.storage.data_dir.clone(),
            streaming: config.streaming.clone(),
            shutdown,
        }
    }

    pub fn engine(&self) -> &Arc<dyn TorrentEngine> {
        &self.engine
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Token cancelled when the service begins shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Registers a magnet and optionally queues files for download.
    ///
    /// With `AllFiles` every file is queued and listed with a stream URL.
    /// With selectors only the tolerant matches are queued and listed;
    /// unmatched selectors are skipped. With neither, the file list is
    /// returned without downloading anything.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - Magnet missing
    /// - `ServiceError::Engine` - Engine rejected the magnet
    pub async fn add_magnet(
        &self,
        request: AddMagnetRequest,
    ) -> Result<AddMagnetResponse, ServiceError> {
        if request.magnet.trim().is_empty() {
            return Err(ServiceError::validation("Magnet is not provided"));
        }
        let handle = self
            .resolver
            .resolve(&SessionQuery::magnet(&request.magnet))
            .await?;
        let info_hash = handle.info_hash();
        let files = handle.files();

        let (playlist_url, listed) = if request.all_files {
            handle.download_all();
            let listed = files.iter().map(|file| added_file(&handle, file, true)).collect();
            (Some(play_url(&info_hash, [])), listed)
        } else if !request.files.is_empty() {
            let matched = find_files(&files, &request.files, MatchMode::Contains);
            queue_files(&handle, &matched)?;
            let playlist_url = (!matched.is_empty()).then(|| {
                play_url(&info_hash, matched.iter().map(|file| file.display_path.as_str()))
            });
            let listed = matched.iter().map(|file| added_file(&handle, file, true)).collect();
            (playlist_url, listed)
        } else {
            let listed = files.iter().map(|file| added_file(&handle, file, false)).collect();
            (None, listed)
        };

        info!("Added torrent {} ({})", handle.name(), info_hash);
        Ok(AddMagnetResponse {
            info_hash,
            name: handle.name(),
            playlist_url,
            files: listed,
        })
    }

    /// Queues files of an already-registered session for download.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - InfoHash missing or malformed, or nothing to select
    /// - `ServiceError::TorrentNotFound` - Session not registered
    pub async fn select_files(
        &self,
        request: SelectFilesRequest,
    ) -> Result<SelectFilesResponse, ServiceError> {
        if request.info_hash.trim().is_empty() || (!request.all_files && request.files.is_empty()) {
            return Err(ServiceError::validation("InfoHash or Files is not provided"));
        }
        let handle = self
            .resolver
            .resolve(&SessionQuery::identifier(&request.info_hash))
            .await?;
        let info_hash = handle.info_hash();
        let files = handle.files();

        let (selected, playlist_url): (Vec<&TorrentFile>, Option<String>) = if request.all_files {
            handle.download_all();
            (files.iter().collect(), Some(play_url(&info_hash, [])))
        } else {
            let matched = find_files(&files, &request.files, MatchMode::Contains);
            queue_files(&handle, &matched)?;
            let playlist_url = (!matched.is_empty()).then(|| {
                play_url(&info_hash, matched.iter().map(|file| file.display_path.as_str()))
            });
            (matched, playlist_url)
        };

        debug!("Selected {} file(s) of {}", selected.len(), info_hash);
        Ok(SelectFilesResponse {
            info_hash,
            all_files: request.all_files,
            files: selected.iter().map(|file| file.display_path.clone()).collect(),
            stream_urls: selected
                .iter()
                .map(|file| stream_url(&info_hash, &file.display_path))
                .collect(),
            playlist_url,
        })
    }

    /// Builds an M3U playlist for a session, queueing the listed files.
    ///
    /// Without selectors every file is queued and listed. Each selector is
    /// tried as an exact display path first, then by token match.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - No source given, or malformed identifier
    /// - `ServiceError::TorrentNotFound` - Identifier not registered
    /// - `ServiceError::Engine` - Engine rejected the magnet or spec
    pub async fn play(
        &self,
        request: PlayRequest,
        scheme: &str,
        host: &str,
    ) -> Result<PlaylistDocument, ServiceError> {
        let query = SessionQuery {
            info_hash: request.info_hash,
            magnet: request.magnet,
            display_names: request.display_names,
            trackers: request.trackers,
        };
        let handle = self.resolver.resolve(&query).await?;
        let files = handle.files();
        let mut playlist = Playlist::new(scheme, host, handle.info_hash());

        if request.files.is_empty() {
            handle.download_all();
            for file in &files {
                playlist.push(&file.display_path);
            }
        } else {
            let mut matched: Vec<&TorrentFile> = Vec::new();
            for selector in &request.files {
                let found = find_file(&files, selector, MatchMode::Exact)
                    .or_else(|| find_file(&files, selector, MatchMode::AllTokens));
                match found {
                    Some(file) if !matched.iter().any(|seen| seen.index == file.index) => {
                        matched.push(file);
                    }
                    Some(_) => {}
                    None => debug!("Playlist selector {:?} matched no file", selector),
                }
            }
            queue_files(&handle, &matched)?;
            for file in matched {
                playlist.push(&file.display_path);
            }
        }

        debug!(
            "Built playlist of {} entries for {}",
            playlist.len(),
            handle.info_hash()
        );
        Ok(PlaylistDocument {
            file_name: playlist.file_name(),
            entries: playlist.len(),
            body: playlist.into_body(),
        })
    }
}

fn queue_files(
    handle: &Arc<dyn TorrentHandle>,
    files: &[&TorrentFile],
) -> Result<(), ServiceError> {
    for file in files {
        handle.download_file(file.index)?;
    }
    Ok(())
}

fn added_file(handle: &Arc<dyn TorrentHandle>, file: &TorrentFile, streamable: bool) -> AddedFile {
    AddedFile {
        file_name: file.display_path.clone(),
        stream_url: streamable.then(|| stream_url(&handle.info_hash(), &file.display_path)),
        file_size_bytes: file.length,
    }
}
