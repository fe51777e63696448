//! Centralized configuration for Tidecast.
//!
//! Settings are read once at startup. The orchestrator only sees the storage
//! and streaming sections; the rest configures the surrounding process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default port of the HTTP surface.
pub const DEFAULT_PORT: u16 = 1010;

/// Central configuration for all Tidecast components.
#[derive(Debug, Clone, Default)]
pub struct TidecastConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub streaming: StreamingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

/// Where session data is materialized.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory; each session writes under `data_dir/<name>`
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tidecast"),
        }
    }
}

/// Engine-side knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Disable seeding to other peers
    pub no_upload: bool,
    /// Content source for the simulated engine
    pub library_dir: Option<PathBuf>,
    /// Simulated download speed in bytes per second
    pub download_rate: u64,
    /// Delay before a known torrent publishes its metadata
    pub metadata_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            no_upload: false,
            library_dir: None,
            download_rate: 8 * 1024 * 1024, // 8 MiB/s
            metadata_delay: Duration::from_millis(250),
        }
    }
}

/// Streaming behavior.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Read-ahead is the file length divided by this value
    pub readahead_divisor: u64,
    /// Upper bound on metadata waits (None = wait until cancelled)
    pub metadata_timeout: Option<Duration>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            readahead_divisor: 100,
            metadata_timeout: None,
        }
    }
}

impl StreamingConfig {
    /// Read-ahead window for a file of `length` bytes.
    pub fn readahead_for(&self, length: u64) -> u64 {
        length / self.readahead_divisor.max(1)
    }
}

/// Error returned for an unparseable listen address.
#[derive(Debug, thiserror::Error)]
#[error("Invalid listen address: {input:?}")]
pub struct InvalidListenAddr {
    pub input: String,
}

/// Parses `host:port`, or `:port` meaning every interface.
pub fn parse_listen_addr(input: &str) -> Result<SocketAddr, InvalidListenAddr> {
    let trimmed = input.trim();
    let candidate = match trimmed.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => trimmed.to_string(),
    };
    candidate.parse().map_err(|_| InvalidListenAddr {
        input: input.to_string(),
    })
}

impl TidecastConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(listen) = std::env::var("TIDECAST_LISTEN")
            && let Ok(addr) = parse_listen_addr(&listen)
        {
            config.server.listen_addr = addr;
        }

        if let Ok(dir) = std::env::var("TIDECAST_DATA_DIR")
            && !dir.is_empty()
        {
            config.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("TIDECAST_LIBRARY")
            && !dir.is_empty()
        {
            config.engine.library_dir = Some(PathBuf::from(dir));
        }

        if let Ok(secs) = std::env::var("TIDECAST_METADATA_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            config.streaming.metadata_timeout = Some(Duration::from_secs(secs));
        }

        // Presence alone enables it
        if std::env::var_os("NOUP").is_some() {
            config.engine.no_upload = true;
        }

        config
    }

    /// Configuration for tests: fast simulated engine, data under `data_dir`.
    pub fn for_testing(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                data_dir: data_dir.into(),
            },
            engine: EngineConfig {
                download_rate: 64 * 1024 * 1024,
                metadata_delay: Duration::ZERO,
                ..EngineConfig::default()
            },
            ..Self::default()
        }
    }
}
