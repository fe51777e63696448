//! In-process engine serving catalog content to the orchestrator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tidecast_core::TidecastConfig;
use tidecast_core::torrent::{
    EngineError, InfoHash, MagnetLink, TorrentEngine, TorrentHandle, TorrentSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::torrent::{Registry, SimTorrent};

/// Tunables for [`SimEngine`].
#[derive(Debug, Clone)]
pub struct SimEngineConfig {
    pub data_dir: PathBuf,
    pub download_rate: u64,
    pub metadata_delay: Duration,
    pub no_upload: bool,
}

impl From<&TidecastConfig> for SimEngineConfig {
    fn from(config: &TidecastConfig) -> Self {
        Self {
            data_dir: config.storage.data_dir.clone(),
            download_rate: config.engine.download_rate,
            metadata_delay: config.engine.metadata_delay,
            no_upload: config.engine.no_upload,
        }
    }
}

/// Simulated BitTorrent engine.
///
/// Sessions for catalog content get metadata after `metadata_delay` and
/// download at `download_rate`; any other infohash stays pending forever.
/// Dropping the engine stops every driver task.
pub struct SimEngine {
    catalog: Arc<Catalog>,
    config: SimEngineConfig,
    sessions: Registry,
    cancel: CancellationToken,
}

impl SimEngine {
    pub fn new(catalog: Arc<Catalog>, config: SimEngineConfig) -> Self {
        if config.no_upload {
            info!("Uploading disabled");
        }
        Self {
            catalog,
            config,
            sessions: Arc::new(Mutex::new(Vec::new())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn uploads_enabled(&self) -> bool {
        !self.config.no_upload
    }

    /// Concrete session, for inspecting download progress.
    pub fn sim_torrent(&self, info_hash: &InfoHash) -> Option<Arc<SimTorrent>> {
        self.sessions
            .lock()
            .iter()
            .find(|torrent| torrent.info_hash() == *info_hash)
            .cloned()
    }

    fn join_or_register(&self, spec: TorrentSpec) -> Arc<SimTorrent> {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions
            .iter()
            .find(|torrent| torrent.info_hash() == spec.info_hash)
        {
            debug!("Joining existing session {}", spec.info_hash);
            return Arc::clone(existing);
        }

        let entry = self.catalog.get(&spec.info_hash);
        if !spec.trackers.is_empty() {
            debug!(
                "Ignoring {} tracker(s) for {}",
                spec.trackers.len(),
                spec.info_hash
            );
        }
        let torrent = SimTorrent::new(
            spec.info_hash,
            spec.display_name,
            entry,
            &self.config.data_dir,
            self.cancel.child_token(),
            &self.sessions,
        );
        sessions.push(Arc::clone(&torrent));
        drop(sessions);

        torrent.start(self.config.metadata_delay, self.config.download_rate);
        info!("Registered session {}", torrent.info_hash());
        torrent
    }
}

impl Drop for SimEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl TorrentEngine for SimEngine {
    async fn add_magnet(&self, magnet_uri: &str) -> Result<Arc<dyn TorrentHandle>, EngineError> {
        let link = MagnetLink::parse(magnet_uri)?;
        let torrent = self.join_or_register(TorrentSpec {
            info_hash: link.info_hash,
            display_name: link.display_name,
            trackers: link.trackers,
        });
        Ok(torrent as Arc<dyn TorrentHandle>)
    }

    async fn add_spec(&self, spec: TorrentSpec) -> Result<Arc<dyn TorrentHandle>, EngineError> {
        Ok(self.join_or_register(spec) as Arc<dyn TorrentHandle>)
    }

    fn torrent(&self, info_hash: &InfoHash) -> Option<Arc<dyn TorrentHandle>> {
        self.sim_torrent(info_hash)
            .map(|torrent| torrent as Arc<dyn TorrentHandle>)
    }

    fn torrents(&self) -> Vec<Arc<dyn TorrentHandle>> {
        self.sessions
            .lock()
            .iter()
            .map(|torrent| Arc::clone(torrent) as Arc<dyn TorrentHandle>)
            .collect()
    }
}
