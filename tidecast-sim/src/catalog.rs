//! Content catalog backing the simulated swarm.
//!
//! Each catalog entry stands in for a torrent that some peer is seeding. The
//! bytes come from a local library directory or from memory.

use std::collections::HashMap;
use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use sha1::{Digest, Sha1};
use tidecast_core::torrent::{InfoHash, MagnetLink};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Simulated peers seeding each catalog entry.
pub const DEFAULT_PEERS: usize = 8;

/// Where a catalog file's bytes live.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Disk(PathBuf),
    Memory(Bytes),
}

impl ContentSource {
    /// Reads exactly `len` bytes starting at `start`.
    ///
    /// # Errors
    /// - `std::io::Error` - Source file unreadable or shorter than requested
    pub async fn read_range(&self, start: u64, len: u64) -> std::io::Result<Bytes> {
        match self {
            ContentSource::Memory(bytes) => {
                let end = start.saturating_add(len);
                if end > bytes.len() as u64 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "range past end of in-memory content",
                    ));
                }
                Ok(bytes.slice(start as usize..end as usize))
            }
            ContentSource::Disk(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(start)).await?;
                let mut buffer = vec![0u8; len as usize];
                file.read_exact(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

/// One member file of a catalog entry.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    /// Path within the torrent; the torrent name for single-file torrents
    pub display_path: String,
    pub length: u64,
    pub source: ContentSource,
}

/// A torrent the simulated swarm can serve.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub info_hash: InfoHash,
    pub name: String,
    pub is_dir: bool,
    pub files: Vec<CatalogFile>,
    pub peers: usize,
}

impl CatalogEntry {
    fn new(name: String, is_dir: bool, files: Vec<CatalogFile>) -> Self {
        Self {
            info_hash: content_hash(&name, &files),
            name,
            is_dir,
            files,
            peers: DEFAULT_PEERS,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }

    pub fn magnet_link(&self) -> String {
        MagnetLink {
            info_hash: self.info_hash,
            display_name: Some(self.name.clone()),
            trackers: Vec::new(),
        }
        .to_uri()
    }
}

/// Deterministic identifier derived from the torrent layout.
fn content_hash(name: &str, files: &[CatalogFile]) -> InfoHash {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    for file in files {
        hasher.update([0u8]);
        hasher.update(file.display_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(file.length.to_be_bytes());
    }
    let digest = hasher.finalize();

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest[..20]);
    InfoHash::new(hash)
}

/// Registry of seedable content, keyed by infohash.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: RwLock<HashMap<InfoHash, Arc<CatalogEntry>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from the top-level entries of `dir`.
    ///
    /// A regular file becomes a single-file torrent; a directory becomes a
    /// multi-file torrent whose display paths are relative to it, sorted.
    /// Hidden entries and empty directories are skipped.
    ///
    /// # Errors
    /// - `std::io::Error` - Failed to read the library directory
    pub async fn scan_dir(dir: &Path) -> std::io::Result<Self> {
        let catalog = Self::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let metadata = entry.metadata().await?;

            if metadata.is_file() {
                let file = CatalogFile {
                    display_path: name.clone(),
                    length: metadata.len(),
                    source: ContentSource::Disk(path),
                };
                catalog.register(CatalogEntry::new(name, false, vec![file]));
            } else if metadata.is_dir() {
                let mut files = Vec::new();
                collect_files(&path, String::new(), &mut files).await?;
                if files.is_empty() {
                    tracing::debug!("Skipping empty library directory {}", path.display());
                    continue;
                }
                files.sort_by(|a, b| a.display_path.cmp(&b.display_path));
                catalog.register(CatalogEntry::new(name, true, files));
            }
        }

        tracing::info!(
            "Scanned {} torrent(s) from {}",
            catalog.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Registers an in-memory single-file torrent.
    pub fn insert_file(&self, name: &str, contents: impl Into<Bytes>) -> Arc<CatalogEntry> {
        let contents = contents.into();
        let file = CatalogFile {
            display_path: name.to_string(),
            length: contents.len() as u64,
            source: ContentSource::Memory(contents),
        };
        self.register(CatalogEntry::new(name.to_string(), false, vec![file]))
    }

    /// Registers an in-memory multi-file torrent. Files keep the given order.
    pub fn insert_dir<P, C>(&self, name: &str, files: Vec<(P, C)>) -> Arc<CatalogEntry>
    where
        P: Into<String>,
        C: Into<Bytes>,
    {
        let files = files
            .into_iter()
            .map(|(path, contents)| {
                let contents = contents.into();
                CatalogFile {
                    display_path: path.into(),
                    length: contents.len() as u64,
                    source: ContentSource::Memory(contents),
                }
            })
            .collect();
        self.register(CatalogEntry::new(name.to_string(), true, files))
    }

    fn register(&self, entry: CatalogEntry) -> Arc<CatalogEntry> {
        let entry = Arc::new(entry);
        self.entries
            .write()
            .insert(entry.info_hash, Arc::clone(&entry));
        entry
    }

    pub fn get(&self, info_hash: &InfoHash) -> Option<Arc<CatalogEntry>> {
        self.entries.read().get(info_hash).cloned()
    }

    /// All entries, ordered by name.
    pub fn entries(&self) -> Vec<Arc<CatalogEntry>> {
        let mut entries: Vec<Arc<CatalogEntry>> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn collect_files<'a>(
    dir: &'a Path,
    prefix: String,
    files: &'a mut Vec<CatalogFile>,
) -> Pin<Box<dyn Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                collect_files(&entry.path(), relative, files).await?;
            } else if metadata.is_file() {
                files.push(CatalogFile {
                    display_path: relative,
                    length: metadata.len(),
                    source: ContentSource::Disk(entry.path()),
                });
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_dir_builds_single_and_multi_file_entries() {
        let library = tempfile::tempdir().unwrap();
        std::fs::write(library.path().join("movie.mp4"), b"movie bytes").unwrap();
        std::fs::create_dir_all(library.path().join("Show/Season 1")).unwrap();
        std::fs::write(library.path().join("Show/Season 1/b.mkv"), b"bb").unwrap();
        std::fs::write(library.path().join("Show/a.mkv"), b"a").unwrap();
        std::fs::write(library.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir_all(library.path().join("Empty")).unwrap();

        let catalog = Catalog::scan_dir(library.path()).await.unwrap();
        let entries = catalog.entries();
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["Show", "movie.mp4"]);

        let show = &entries[0];
        assert!(show.is_dir);
        let paths: Vec<&str> = show.files.iter().map(|f| f.display_path.as_str()).collect();
        assert_eq!(paths, vec!["Season 1/b.mkv", "a.mkv"]);
        assert_eq!(show.total_size(), 3);

        let movie = &entries[1];
        assert!(!movie.is_dir);
        assert_eq!(movie.files[0].display_path, "movie.mp4");
        assert_eq!(movie.files[0].length, 11);
    }

    #[tokio::test]
    async fn test_read_range_from_both_sources() {
        let library = tempfile::tempdir().unwrap();
        let path = library.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let disk = ContentSource::Disk(path);
        assert_eq!(&disk.read_range(3, 4).await.unwrap()[..], b"3456");

        let memory = ContentSource::Memory(Bytes::from_static(b"abcdef"));
        assert_eq!(&memory.read_range(4, 2).await.unwrap()[..], b"ef");
        assert!(memory.read_range(4, 5).await.is_err());
    }

    #[test]
    fn test_hash_is_deterministic_and_layout_sensitive() {
        let catalog = Catalog::new();
        let first = catalog.insert_file("clip.mp4", &b"abc"[..]);
        let again = Catalog::new().insert_file("clip.mp4", &b"xyz"[..]);
        let renamed = Catalog::new().insert_file("other.mp4", &b"abc"[..]);

        assert_eq!(first.info_hash, again.info_hash);
        assert_ne!(first.info_hash, renamed.info_hash);
        assert!(catalog.get(&first.info_hash).is_some());
    }

    #[test]
    fn test_magnet_link_round_trips() {
        let entry = Catalog::new().insert_file("My Clip.mp4", &b"abc"[..]);
        let link = MagnetLink::parse(&entry.magnet_link()).unwrap();
        assert_eq!(link.info_hash, entry.info_hash);
        assert_eq!(link.display_name.as_deref(), Some("My Clip.mp4"));
    }
}
