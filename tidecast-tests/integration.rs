//! Integration tests for Tidecast
//!
//! Drive the HTTP router end to end against the simulated engine: session
//! registration, file selection, ranged streaming, playlists and teardown.

#[path = "integration/common.rs"]
mod common;

#[path = "integration/api_workflow.rs"]
mod api_workflow;
#[path = "integration/lifecycle.rs"]
mod lifecycle;
#[path = "integration/streaming.rs"]
mod streaming;
