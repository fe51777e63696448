//! Simulated download session.
//!
//! Metadata arrives after a configured delay for catalog content and never
//! for unknown infohashes. Once it arrives a driver task copies wanted files
//! from the catalog source into the data directory at a fixed rate.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tidecast_core::torrent::{
    EngineError, FileReader, InfoHash, PeerStats, TorrentFile, TorrentHandle,
};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogEntry, ContentSource};
use crate::reader::SimReader;

/// Driver tick period.
pub const TICK: Duration = Duration::from_millis(100);

pub(crate) type Registry = Arc<Mutex<Vec<Arc<SimTorrent>>>>;
type RegistryRef = Weak<Mutex<Vec<Arc<SimTorrent>>>>;

/// Download progress of one member file.
#[derive(Debug)]
pub struct FileProgress {
    pub index: usize,
    pub display_path: String,
    pub length: u64,
    pub offset: u64,
    pub destination: PathBuf,
    source: ContentSource,
    completed: watch::Sender<u64>,
    wanted: AtomicBool,
    responsive_readers: AtomicUsize,
    readahead: AtomicU64,
}

impl FileProgress {
    /// Bytes available from the start of the file.
    pub fn completed(&self) -> u64 {
        *self.completed.borrow()
    }

    pub fn is_complete(&self) -> bool {
        self.completed() >= self.length
    }

    pub fn is_wanted(&self) -> bool {
        self.wanted.load(Ordering::SeqCst)
    }

    pub fn is_responsive(&self) -> bool {
        self.responsive_readers.load(Ordering::SeqCst) > 0
    }

    /// Largest read-ahead requested by any reader.
    pub fn readahead(&self) -> u64 {
        self.readahead.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.completed.subscribe()
    }

    pub(crate) fn request_readahead(&self, bytes: u64) {
        self.readahead.fetch_max(bytes, Ordering::SeqCst);
    }

    pub(crate) fn attach_responsive(&self) {
        self.responsive_readers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn detach_responsive(&self) {
        self.responsive_readers.fetch_sub(1, Ordering::SeqCst);
    }

    fn mark_wanted(&self) {
        self.wanted.store(true, Ordering::SeqCst);
    }

    /// Copies up to `budget` bytes past the completed prefix to disk.
    async fn advance(&self, budget: u64) -> std::io::Result<u64> {
        let start = self.completed();
        let len = budget.min(self.length.saturating_sub(start));
        if len == 0 {
            return Ok(0);
        }
        let chunk = self.source.read_range(start, len).await?;

        if let Some(parent) = self.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.destination)
            .await?;
        file.seek(SeekFrom::Start(start)).await?;
        file.write_all(&chunk).await?;
        file.flush().await?;

        self.completed.send_replace(start + len);
        Ok(len)
    }

    fn snapshot(&self) -> TorrentFile {
        TorrentFile {
            index: self.index,
            display_path: self.display_path.clone(),
            length: self.length,
            bytes_completed: self.completed().min(self.length),
            offset: self.offset,
        }
    }
}

/// A session in the simulated engine.
pub struct SimTorrent {
    info_hash: InfoHash,
    name: RwLock<String>,
    entry: Option<Arc<CatalogEntry>>,
    files: OnceLock<Vec<Arc<FileProgress>>>,
    metadata: watch::Sender<bool>,
    cancel: CancellationToken,
    data_dir: PathBuf,
    registry: RegistryRef,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl SimTorrent {
    pub(crate) fn new(
        info_hash: InfoHash,
        display_name: Option<String>,
        entry: Option<Arc<CatalogEntry>>,
        data_dir: &Path,
        cancel: CancellationToken,
        registry: &Registry,
    ) -> Arc<Self> {
        let (metadata, _) = watch::channel(false);
        Arc::new(Self {
            info_hash,
            name: RwLock::new(display_name.unwrap_or_else(|| info_hash.to_hex())),
            entry,
            files: OnceLock::new(),
            metadata,
            cancel,
            data_dir: data_dir.to_path_buf(),
            registry: Arc::downgrade(registry),
            driver: Mutex::new(None),
        })
    }

    /// Spawns the metadata and download driver task.
    pub(crate) fn start(self: &Arc<Self>, metadata_delay: Duration, download_rate: u64) {
        let torrent = Arc::clone(self);
        let driver = tokio::spawn(async move { torrent.run(metadata_delay, download_rate).await });
        *self.driver.lock() = Some(driver);
    }

    async fn run(self: Arc<Self>, metadata_delay: Duration, download_rate: u64) {
        let Some(entry) = self.entry.clone() else {
            debug!("No swarm for {}, metadata will never arrive", self.info_hash);
            return;
        };

        tokio::select! {
            () = tokio::time::sleep(metadata_delay) => {}
            () = self.cancel.cancelled() => return,
        }
        self.publish_metadata(&entry);

        let budget = download_rate.saturating_mul(TICK.as_millis() as u64) / 1000;
        let mut ticker = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.cancel.cancelled() => break,
            }
            if let Err(err) = self.download_tick(budget.max(1)).await {
                warn!("Download tick for {} failed: {}", self.info_hash, err);
            }
        }
        debug!("Driver for {} stopped", self.info_hash);
    }

    fn publish_metadata(&self, entry: &CatalogEntry) {
        let root = self.data_dir.join(&entry.name);
        let mut offset = 0;
        let files = entry
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let destination = if entry.is_dir {
                    root.join(&file.display_path)
                } else {
                    root.clone()
                };
                let (completed, _) = watch::channel(0);
                let progress = Arc::new(FileProgress {
                    index,
                    display_path: file.display_path.clone(),
                    length: file.length,
                    offset,
                    destination,
                    source: file.source.clone(),
                    completed,
                    wanted: AtomicBool::new(false),
                    responsive_readers: AtomicUsize::new(0),
                    readahead: AtomicU64::new(0),
                });
                offset += file.length;
                progress
            })
            .collect();

        if self.files.set(files).is_err() {
            return;
        }
        *self.name.write() = entry.name.clone();
        self.metadata.send_replace(true);
        info!("Metadata ready for {} ({})", entry.name, self.info_hash);
    }

    /// Spends `budget` bytes: files with a responsive reader first, then
    /// wanted files in enumeration order.
    async fn download_tick(&self, mut budget: u64) -> std::io::Result<()> {
        let Some(files) = self.files.get() else {
            return Ok(());
        };
        let mut queue: Vec<&Arc<FileProgress>> = files
            .iter()
            .filter(|file| file.is_wanted() && !file.is_complete())
            .collect();
        queue.sort_by_key(|file| !file.is_responsive());

        for file in queue {
            if budget == 0 || self.cancel.is_cancelled() {
                break;
            }
            budget -= file.advance(budget).await?;
            if file.is_complete() {
                debug!("Completed {} of {}", file.display_path, self.info_hash);
            }
        }
        Ok(())
    }

    fn is_downloading(&self) -> bool {
        self.files
            .get()
            .is_some_and(|files| files.iter().any(|f| f.is_wanted() && !f.is_complete()))
    }

    fn progress(&self, index: usize) -> Result<&Arc<FileProgress>, EngineError> {
        let files = self.files.get().ok_or(EngineError::MetadataPending {
            info_hash: self.info_hash,
        })?;
        files.get(index).ok_or(EngineError::FileIndexOutOfRange {
            info_hash: self.info_hash,
            index,
        })
    }

    /// Progress of every member file; empty until metadata arrives.
    pub fn file_progress(&self) -> Vec<Arc<FileProgress>> {
        self.files.get().cloned().unwrap_or_default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl TorrentHandle for SimTorrent {
    fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    fn name(&self) -> String {
        self.name.read().clone()
    }

    fn has_metadata(&self) -> bool {
        *self.metadata.borrow()
    }

    async fn wait_metadata(&self) -> Result<(), EngineError> {
        let mut ready = self.metadata.subscribe();
        let dropped = EngineError::Dropped {
            info_hash: self.info_hash,
        };
        tokio::select! {
            result = ready.wait_for(|ready| *ready) => result.map(|_| ()).map_err(|_| dropped),
            () = self.cancel.cancelled() => Err(dropped),
        }
    }

    fn is_dir(&self) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|entry| entry.is_dir && self.has_metadata())
    }

    fn files(&self) -> Vec<TorrentFile> {
        self.files
            .get()
            .map(|files| files.iter().map(|file| file.snapshot()).collect())
            .unwrap_or_default()
    }

    fn peer_stats(&self) -> PeerStats {
        let Some(entry) = &self.entry else {
            return PeerStats::default();
        };
        let peers = entry.peers;
        if !self.has_metadata() {
            let half_open = peers.min(2);
            PeerStats {
                total: peers,
                active: 0,
                half_open,
                pending: peers - half_open,
            }
        } else if self.is_downloading() {
            PeerStats {
                total: peers,
                active: peers,
                half_open: 0,
                pending: 0,
            }
        } else {
            PeerStats {
                total: peers,
                active: 0,
                half_open: 0,
                pending: peers,
            }
        }
    }

    fn download_file(&self, index: usize) -> Result<(), EngineError> {
        self.progress(index)?.mark_wanted();
        Ok(())
    }

    fn download_all(&self) {
        match self.files.get() {
            Some(files) => files.iter().for_each(|file| file.mark_wanted()),
            None => warn!("download_all on {} before metadata, ignored", self.info_hash),
        }
    }

    fn open_reader(&self, index: usize) -> Result<Box<dyn FileReader>, EngineError> {
        let progress = Arc::clone(self.progress(index)?);
        Ok(Box::new(SimReader::new(progress, self.cancel.clone())))
    }

    async fn drop_torrent(&self) {
        self.cancel.cancel();
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .retain(|torrent| torrent.info_hash != self.info_hash);
        }

        // No writes may land after this returns
        let driver = self.driver.lock().take();
        if let Some(driver) = driver
            && let Err(err) = driver.await
        {
            warn!("Driver for {} ended abnormally: {}", self.info_hash, err);
        }
        info!("Dropped torrent {}", self.info_hash);
    }
}
