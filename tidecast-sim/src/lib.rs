//! Tidecast Simulation - an in-process stand-in for a BitTorrent engine.
//!
//! [`SimEngine`] implements the orchestrator's engine traits over a
//! [`Catalog`] of local or in-memory content. Sessions for catalog entries
//! publish metadata after a short delay and "download" by copying bytes into
//! the data directory at a configured rate, so the HTTP surface can be run
//! and tested end to end without a swarm.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tidecast_core::TidecastConfig;
//! use tidecast_sim::{Catalog, SimEngine, SimEngineConfig};
//!
//! # async fn run() -> std::io::Result<()> {
//! let config = TidecastConfig::default();
//! let catalog = Catalog::scan_dir(std::path::Path::new("./library")).await?;
//! let engine = SimEngine::new(Arc::new(catalog), SimEngineConfig::from(&config));
//! # let _ = engine;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod engine;
pub mod reader;
pub mod torrent;

pub use catalog::{Catalog, CatalogEntry, CatalogFile, ContentSource};
pub use engine::{SimEngine, SimEngineConfig};
pub use reader::SimReader;
pub use torrent::{FileProgress, SimTorrent};
