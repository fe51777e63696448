//! Tidecast Web - HTTP surface for the torrent session orchestrator
//!
//! JSON endpoints for adding, selecting, listing and removing sessions,
//! byte-range streaming of member files, and M3U playlist generation.

pub mod error;
pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, router, run_server};
