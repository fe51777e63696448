//! Preparing a member file for byte-range streaming.

use tracing::debug;

use super::{MatchMode, ServiceError, SessionQuery, TorrentService, find_file};
use crate::torrent::{FileReader, InfoHash, TorrentFile, leaf_name};

/// An opened member file ready to be served.
pub struct StreamSource {
    pub info_hash: InfoHash,
    pub file: TorrentFile,
    pub reader: Box<dyn FileReader>,
}

impl StreamSource {
    /// Slash-free name for `Content-Disposition`.
    pub fn disposition_name(&self) -> &str {
        leaf_name(&self.file.display_path)
    }

    pub fn length(&self) -> u64 {
        self.file.length
    }
}

impl std::fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("info_hash", &self.info_hash)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl TorrentService {
    /// Opens a reader over the file whose display path is exactly `file`.
    ///
    /// The reader is switched to responsive mode with a read-ahead of a
    /// fixed fraction of the file length. Opening does not queue the file
    /// for download.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - A parameter is missing or the identifier is malformed
    /// - `ServiceError::TorrentNotFound` - Session not registered
    /// - `ServiceError::FileNotFound` - No file with that exact display path
    pub async fn open_stream(
        &self,
        info_hash: Option<&str>,
        file: Option<&str>,
    ) -> Result<StreamSource, ServiceError> {
        let (Some(raw_hash), Some(selector)) = (
            info_hash.filter(|raw| !raw.is_empty()),
            file.filter(|raw| !raw.is_empty()),
        ) else {
            return Err(ServiceError::validation("InfoHash or File is not provided"));
        };

        let handle = self
            .resolver
            .resolve(&SessionQuery::identifier(raw_hash))
            .await?;
        let info_hash = handle.info_hash();
        let files = handle.files();
        let file = find_file(&files, selector, MatchMode::Exact)
            .cloned()
            .ok_or_else(|| ServiceError::FileNotFound {
                info_hash,
                selector: selector.to_string(),
            })?;

        let mut reader = handle.open_reader(file.index)?;
        let readahead = self.streaming.readahead_for(file.length);
        reader.set_readahead(readahead);
        reader.set_responsive();
        debug!(
            "Streaming {} of {} (readahead {} bytes)",
            file.display_path, info_hash, readahead
        );

        Ok(StreamSource {
            info_hash,
            file,
            reader,
        })
    }
}
