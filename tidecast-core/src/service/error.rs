//! Orchestrator error taxonomy.

use crate::torrent::{EngineError, InfoHash};

/// Errors surfaced by [`TorrentService`](super::TorrentService) operations.
///
/// Validation and not-found errors are raised before (or instead of) any
/// engine mutation; engine failures carry the collaborator's own error.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Torrent not found")]
    TorrentNotFound { info_hash: InfoHash },

    #[error("File not found")]
    FileNotFound { info_hash: InfoHash, selector: String },

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("Metadata wait for {info_hash} cancelled by shutdown")]
    MetadataCancelled { info_hash: InfoHash },

    #[error("Timed out waiting for metadata of {info_hash}")]
    MetadataTimeout { info_hash: InfoHash },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Engine,
    Unavailable,
    Io,
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::TorrentNotFound { .. } | Self::FileNotFound { .. } => ErrorKind::NotFound,
            Self::Engine(_) => ErrorKind::Engine,
            Self::MetadataCancelled { .. } | Self::MetadataTimeout { .. } => {
                ErrorKind::Unavailable
            }
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let info_hash = InfoHash::new([3; 20]);
        assert_eq!(
            ServiceError::validation("InfoHash not valid").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ServiceError::TorrentNotFound { info_hash }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::FileNotFound {
                info_hash,
                selector: "x".to_string()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::from(EngineError::AddFailed {
                reason: "boom".to_string()
            })
            .kind(),
            ErrorKind::Engine
        );
        assert_eq!(
            ServiceError::MetadataTimeout { info_hash }.kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            ServiceError::validation("Magnet is not provided").to_string(),
            "Magnet is not provided"
        );
        assert_eq!(
            ServiceError::TorrentNotFound {
                info_hash: InfoHash::new([0; 20])
            }
            .to_string(),
            "Torrent not found"
        );
    }
}
