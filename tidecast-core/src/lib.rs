//! Tidecast Core - torrent session orchestration for HTTP media streaming
//!
//! This crate maps HTTP-facing operations (add, select, stream, list, remove,
//! play) onto download sessions owned by an injected BitTorrent engine. The
//! engine itself sits behind the [`TorrentEngine`] trait.

pub mod config;
pub mod service;
pub mod torrent;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::TidecastConfig;
pub use service::{ErrorKind, ServiceError, TorrentService};
pub use torrent::{EngineError, InfoHash, TorrentEngine, TorrentHandle};
