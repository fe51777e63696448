//! Collaborator interface every BitTorrent engine must provide.
//!
//! The engine owns all session state and synchronizes it internally. The
//! orchestrator only ever holds an `Arc<dyn TorrentHandle>` for the duration
//! of one request.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek};

use super::{EngineError, InfoHash, PeerStats, TorrentFile};

/// Detailed registration request: identifier plus optional hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSpec {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
}

/// Registry of live download sessions.
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Registers a session from a magnet URI, or joins the existing one.
    ///
    /// Returns immediately; metadata may still be pending.
    ///
    /// # Errors
    /// - `EngineError::InvalidMagnet` - Malformed magnet URI
    /// - `EngineError::AddFailed` - Engine refused the registration
    async fn add_magnet(&self, magnet_uri: &str) -> Result<Arc<dyn TorrentHandle>, EngineError>;

    /// Registers a session from an identifier, display name and trackers.
    ///
    /// # Errors
    /// - `EngineError::AddFailed` - Engine refused the registration
    async fn add_spec(&self, spec: TorrentSpec) -> Result<Arc<dyn TorrentHandle>, EngineError>;

    /// Looks up a live session.
    fn torrent(&self, info_hash: &InfoHash) -> Option<Arc<dyn TorrentHandle>>;

    /// Every live session in registration order.
    fn torrents(&self) -> Vec<Arc<dyn TorrentHandle>>;
}

/// Transient handle to one live session.
#[async_trait]
pub trait TorrentHandle: Send + Sync {
    fn info_hash(&self) -> InfoHash;

    /// Display name; falls back to the magnet `dn` or hex identifier before metadata.
    fn name(&self) -> String;

    fn has_metadata(&self) -> bool;

    /// Suspends until the metadata-ready signal fires.
    ///
    /// No timeout is applied here; callers bound the wait themselves.
    ///
    /// # Errors
    /// - `EngineError::Dropped` - Session was dropped while waiting
    async fn wait_metadata(&self) -> Result<(), EngineError>;

    /// True for multi-file torrents.
    fn is_dir(&self) -> bool;

    /// Member files in enumeration order; empty until metadata is ready.
    fn files(&self) -> Vec<TorrentFile>;

    fn peer_stats(&self) -> PeerStats;

    /// Marks one file for background download.
    ///
    /// # Errors
    /// - `EngineError::FileIndexOutOfRange` - No such file
    fn download_file(&self, index: usize) -> Result<(), EngineError>;

    /// Marks every file for background download.
    fn download_all(&self);

    /// Opens a sequential, seekable reader over one file.
    ///
    /// # Errors
    /// - `EngineError::FileIndexOutOfRange` - No such file
    /// - `EngineError::MetadataPending` - Files are not known yet
    fn open_reader(&self, index: usize) -> Result<Box<dyn FileReader>, EngineError>;

    /// Stops the session and removes it from the registry.
    ///
    /// Writers for this session have stopped once the future resolves.
    async fn drop_torrent(&self);
}

/// Reader over one member file.
///
/// Reads past the downloaded region wait for data instead of returning short.
/// Positions are relative to the start of the file.
pub trait FileReader: AsyncRead + AsyncSeek + Send + Unpin {
    /// Number of bytes beyond the cursor the engine should prioritize.
    fn set_readahead(&mut self, bytes: u64);

    /// Prefer pieces around the cursor over purely sequential fetching.
    fn set_responsive(&mut self);
}
