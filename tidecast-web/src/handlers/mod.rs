//! HTTP request handlers organized by functionality

pub mod api;
pub mod play;
pub mod range;
pub mod stream;
pub mod utils;

pub use api::{add_magnet, list_torrents, remove_torrent, select_file, torrent_stats};
pub use play::play;
pub use stream::stream_file;
