//! Torrent primitives and the engine collaborator interface.
//!
//! The orchestrator never speaks the BitTorrent protocol itself. Everything
//! below the [`TorrentEngine`] trait (peer discovery, piece verification, disk
//! scheduling) belongs to an engine implementation injected at startup.

pub mod engine;
pub mod magnet;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

use std::fmt;
use std::str::FromStr;

pub use engine::{FileReader, TorrentEngine, TorrentHandle, TorrentSpec};
pub use magnet::MagnetLink;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length in bytes of a torrent content identifier.
pub const INFO_HASH_LEN: usize = 20;

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte SHA-1 hash of the info dictionary from a torrent file.
/// Rendered as 40 lower-case hex characters on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; INFO_HASH_LEN]);

impl InfoHash {
    /// Creates InfoHash from 20-byte SHA-1 hash.
    pub fn new(hash: [u8; INFO_HASH_LEN]) -> Self {
        Self(hash)
    }

    /// Parses a 40 character hex string.
    ///
    /// # Errors
    /// - `InvalidInfoHash` - Input is not exactly 40 hex characters
    pub fn from_hex(hex_str: &str) -> Result<Self, InvalidInfoHash> {
        if hex_str.len() != INFO_HASH_LEN * 2 {
            return Err(InvalidInfoHash {
                input: hex_str.to_string(),
            });
        }

        let mut hash = [0u8; INFO_HASH_LEN];
        hex::decode_to_slice(hex_str, &mut hash).map_err(|_| InvalidInfoHash {
            input: hex_str.to_string(),
        })?;
        Ok(Self(hash))
    }

    /// Returns reference to underlying 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; INFO_HASH_LEN] {
        &self.0
    }

    /// Lower-case hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for InfoHash {
    type Err = InvalidInfoHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Rejected identifier input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("InfoHash not valid: {input:?}")]
pub struct InvalidInfoHash {
    pub input: String,
}

/// One member file of a torrent, as advertised by the engine.
///
/// A snapshot: `bytes_completed` is whatever the engine reported when the
/// snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    /// Position in the torrent's file enumeration order
    pub index: usize,
    /// Slash-separated path relative to the torrent root, never empty
    pub display_path: String,
    /// File size in bytes
    pub length: u64,
    /// Bytes verified and written so far, never above `length`
    pub bytes_completed: u64,
    /// Byte offset of the file within the torrent's piece space
    pub offset: u64,
}

impl TorrentFile {
    /// Last path segment of the display path.
    pub fn leaf_name(&self) -> &str {
        leaf_name(&self.display_path)
    }

    /// True once at least one byte of the file is on disk.
    pub fn is_on_disk(&self) -> bool {
        self.bytes_completed > 0
    }
}

/// Last segment of a slash-separated display path.
pub fn leaf_name(display_path: &str) -> &str {
    display_path.rsplit('/').next().unwrap_or(display_path)
}

/// Display path with separators replaced by spaces, safe for single-line labels.
pub fn flatten_display_path(display_path: &str) -> String {
    display_path.replace('/', " ")
}

/// Peer connection counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStats {
    pub total: usize,
    pub active: usize,
    pub half_open: usize,
    pub pending: usize,
}

/// Errors reported by an engine implementation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid magnet link: {reason}")]
    InvalidMagnet { reason: String },

    #[error("Torrent add error: {reason}")]
    AddFailed { reason: String },

    #[error("File index {index} out of range for torrent {info_hash}")]
    FileIndexOutOfRange { info_hash: InfoHash, index: usize },

    #[error("Torrent {info_hash} metadata not available yet")]
    MetadataPending { info_hash: InfoHash },

    #[error("Torrent {info_hash} was dropped")]
    Dropped { info_hash: InfoHash },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hash_display() {
        let hash = [
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab,
            0xcd, 0xef, 0x01, 0x23, 0x45, 0x67,
        ];
        let info_hash = InfoHash::new(hash);
        assert_eq!(
            info_hash.to_string(),
            "0123456789abcdef0123456789abcdef01234567"
        );
        assert_eq!(info_hash.to_hex(), info_hash.to_string());
    }

    #[test]
    fn test_info_hash_from_hex_accepts_mixed_case() {
        let parsed = InfoHash::from_hex("0123456789ABCDEF0123456789abcdef01234567").unwrap();
        assert_eq!(
            parsed.to_string(),
            "0123456789abcdef0123456789abcdef01234567"
        );
    }

    #[test]
    fn test_info_hash_rejects_wrong_length_and_non_hex() {
        assert!(InfoHash::from_hex("short").is_err());
        assert!(InfoHash::from_hex("").is_err());
        assert!(InfoHash::from_hex(&"a".repeat(41)).is_err());
        assert!(InfoHash::from_hex(&"z".repeat(40)).is_err());
    }

    #[test]
    fn test_info_hash_serde_is_hex_string() {
        let info_hash = InfoHash::new([0xab; 20]);
        let json = serde_json::to_string(&info_hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let back: InfoHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info_hash);
    }

    #[test]
    fn test_display_path_helpers() {
        assert_eq!(leaf_name("Season 1/Episode 01.mkv"), "Episode 01.mkv");
        assert_eq!(leaf_name("movie.mp4"), "movie.mp4");
        assert_eq!(
            flatten_display_path("Show/Season 1/e01.mkv"),
            "Show Season 1 e01.mkv"
        );
    }
}
