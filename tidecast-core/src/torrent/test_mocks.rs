//! Mock engine for testing the orchestrator.
//!
//! Sessions are pre-seeded with fixed file contents. Nothing downloads in the
//! background; the mock only records which files were asked for so tests can
//! assert on orchestration behavior.

use std::collections::HashSet;
use std::io::{Cursor, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio::sync::watch;

use super::engine::{FileReader, TorrentEngine, TorrentHandle, TorrentSpec};
use super::magnet::MagnetLink;
use super::{EngineError, InfoHash, PeerStats, TorrentFile};

/// Reader settings applied by the last caller, shared with the test.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    pub readahead: Option<u64>,
    pub responsive: bool,
}

/// One seeded member file.
#[derive(Debug, Clone)]
pub struct MockFile {
    pub display_path: String,
    pub contents: Bytes,
    pub bytes_completed: u64,
}

impl MockFile {
    /// File whose bytes are all already on disk.
    pub fn complete(display_path: &str, contents: &[u8]) -> Self {
        Self {
            display_path: display_path.to_string(),
            contents: Bytes::copy_from_slice(contents),
            bytes_completed: contents.len() as u64,
        }
    }

    /// File with nothing downloaded yet.
    pub fn empty(display_path: &str, contents: &[u8]) -> Self {
        Self {
            bytes_completed: 0,
            ..Self::complete(display_path, contents)
        }
    }
}

/// In-memory session.
pub struct MockTorrent {
    info_hash: InfoHash,
    name: Mutex<String>,
    is_dir: bool,
    files: Vec<MockFile>,
    metadata: watch::Sender<bool>,
    peers: PeerStats,
    wanted: Mutex<HashSet<usize>>,
    download_all_calls: AtomicUsize,
    dropped: AtomicBool,
    reader_settings: Arc<Mutex<ReaderSettings>>,
    registry: Arc<Mutex<Vec<Arc<MockTorrent>>>>,
}

impl MockTorrent {
    /// Indices passed to `download_file` or covered by `download_all`.
    pub fn wanted_files(&self) -> Vec<usize> {
        let mut wanted: Vec<usize> = self.wanted.lock().iter().copied().collect();
        wanted.sort_unstable();
        wanted
    }

    pub fn download_all_calls(&self) -> usize {
        self.download_all_calls.load(Ordering::SeqCst)
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn reader_settings(&self) -> ReaderSettings {
        *self.reader_settings.lock()
    }

    /// Fires the metadata-ready signal for a session seeded without it.
    pub fn publish_metadata(&self) {
        self.metadata.send_replace(true);
    }
}

#[async_trait]
impl TorrentHandle for MockTorrent {
    fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    fn name(&self) -> String {
        self.name.lock().clone()
    }

    fn has_metadata(&self) -> bool {
        *self.metadata.borrow()
    }

    async fn wait_metadata(&self) -> Result<(), EngineError> {
        let mut ready = self.metadata.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| EngineError::Dropped {
                info_hash: self.info_hash,
            })
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn files(&self) -> Vec<TorrentFile> {
        if !self.has_metadata() {
            return Vec::new();
        }
        let mut offset = 0;
        self.files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let length = file.contents.len() as u64;
                let entry = TorrentFile {
                    index,
                    display_path: file.display_path.clone(),
                    length,
                    bytes_completed: file.bytes_completed.min(length),
                    offset,
                };
                offset += length;
                entry
            })
            .collect()
    }

    fn peer_stats(&self) -> PeerStats {
        self.peers
    }

    fn download_file(&self, index: usize) -> Result<(), EngineError> {
        if index >= self.files.len() {
            return Err(EngineError::FileIndexOutOfRange {
                info_hash: self.info_hash,
                index,
            });
        }
        self.wanted.lock().insert(index);
        Ok(())
    }

    fn download_all(&self) {
        self.download_all_calls.fetch_add(1, Ordering::SeqCst);
        self.wanted.lock().extend(0..self.files.len());
    }

    fn open_reader(&self, index: usize) -> Result<Box<dyn FileReader>, EngineError> {
        if !self.has_metadata() {
            return Err(EngineError::MetadataPending {
                info_hash: self.info_hash,
            });
        }
        let file = self
            .files
            .get(index)
            .ok_or(EngineError::FileIndexOutOfRange {
                info_hash: self.info_hash,
                index,
            })?;
        Ok(Box::new(MockReader {
            cursor: Cursor::new(file.contents.clone()),
            settings: Arc::clone(&self.reader_settings),
        }))
    }

    async fn drop_torrent(&self) {
        self.dropped.store(true, Ordering::SeqCst);
        self.registry
            .lock()
            .retain(|torrent| torrent.info_hash != self.info_hash);
    }
}

/// Reader over an in-memory buffer that records the settings it receives.
pub struct MockReader {
    cursor: Cursor<Bytes>,
    settings: Arc<Mutex<ReaderSettings>>,
}

impl AsyncRead for MockReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.cursor).poll_read(cx, buf)
    }
}

impl AsyncSeek for MockReader {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> std::io::Result<()> {
        Pin::new(&mut self.cursor).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
        Pin::new(&mut self.cursor).poll_complete(cx)
    }
}

impl FileReader for MockReader {
    fn set_readahead(&mut self, bytes: u64) {
        self.settings.lock().readahead = Some(bytes);
    }

    fn set_responsive(&mut self) {
        self.settings.lock().responsive = true;
    }
}

/// Mock engine registry.
#[derive(Default)]
pub struct MockEngine {
    torrents: Arc<Mutex<Vec<Arc<MockTorrent>>>>,
    add_calls: AtomicUsize,
    last_magnet: Mutex<Option<String>>,
    last_spec: Mutex<Option<TorrentSpec>>,
    fail_adds: AtomicBool,
}

impl MockEngine {
    /// Creates a new empty mock engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent add fail with `EngineError::AddFailed`.
    pub fn fail_adds(&self) {
        self.fail_adds.store(true, Ordering::SeqCst);
    }

    /// Seeds a session whose metadata is already available.
    pub fn seed(&self, info_hash: InfoHash, name: &str, files: Vec<MockFile>) -> Arc<MockTorrent> {
        self.seed_with(info_hash, name, files, true)
    }

    /// Seeds a session, optionally leaving metadata pending.
    pub fn seed_with(
        &self,
        info_hash: InfoHash,
        name: &str,
        files: Vec<MockFile>,
        metadata_ready: bool,
    ) -> Arc<MockTorrent> {
        let (metadata, _) = watch::channel(metadata_ready);
        let torrent = Arc::new(MockTorrent {
            info_hash,
            name: Mutex::new(name.to_string()),
            is_dir: files.len() > 1,
            files,
            metadata,
            peers: PeerStats {
                total: 4,
                active: 2,
                half_open: 1,
                pending: 1,
            },
            wanted: Mutex::new(HashSet::new()),
            download_all_calls: AtomicUsize::new(0),
            dropped: AtomicBool::new(false),
            reader_settings: Arc::new(Mutex::new(ReaderSettings::default())),
            registry: Arc::clone(&self.torrents),
        });
        self.torrents.lock().push(Arc::clone(&torrent));
        torrent
    }

    /// Concrete handle for assertions.
    pub fn mock_torrent(&self, info_hash: &InfoHash) -> Option<Arc<MockTorrent>> {
        self.torrents
            .lock()
            .iter()
            .find(|torrent| torrent.info_hash == *info_hash)
            .cloned()
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn last_magnet(&self) -> Option<String> {
        self.last_magnet.lock().clone()
    }

    pub fn last_spec(&self) -> Option<TorrentSpec> {
        self.last_spec.lock().clone()
    }

    fn check_add(&self) -> Result<(), EngineError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(EngineError::AddFailed {
                reason: "mock engine configured to fail".to_string(),
            });
        }
        Ok(())
    }

    fn join_or_register(&self, info_hash: InfoHash, name: Option<&str>) -> Arc<dyn TorrentHandle> {
        if let Some(existing) = self.mock_torrent(&info_hash) {
            return existing;
        }
        let fallback = info_hash.to_hex();
        self.seed_with(info_hash, name.unwrap_or(&fallback), Vec::new(), false)
    }
}

#[async_trait]
impl TorrentEngine for MockEngine {
    async fn add_magnet(&self, magnet_uri: &str) -> Result<Arc<dyn TorrentHandle>, EngineError> {
        self.check_add()?;
        *self.last_magnet.lock() = Some(magnet_uri.to_string());
        let link = MagnetLink::parse(magnet_uri)?;
        Ok(self.join_or_register(link.info_hash, link.display_name.as_deref()))
    }

    async fn add_spec(&self, spec: TorrentSpec) -> Result<Arc<dyn TorrentHandle>, EngineError> {
        self.check_add()?;
        *self.last_spec.lock() = Some(spec.clone());
        Ok(self.join_or_register(spec.info_hash, spec.display_name.as_deref()))
    }

    fn torrent(&self, info_hash: &InfoHash) -> Option<Arc<dyn TorrentHandle>> {
        self.mock_torrent(info_hash)
            .map(|torrent| torrent as Arc<dyn TorrentHandle>)
    }

    fn torrents(&self) -> Vec<Arc<dyn TorrentHandle>> {
        self.torrents
            .lock()
            .iter()
            .map(|torrent| Arc::clone(torrent) as Arc<dyn TorrentHandle>)
            .collect()
    }
}
