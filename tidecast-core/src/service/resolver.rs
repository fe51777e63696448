//! Turns an identifier or a magnet into a session with metadata.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ServiceError;
use crate::torrent::{EngineError, InfoHash, TorrentEngine, TorrentHandle, TorrentSpec, magnet};

/// Parses a caller-supplied identifier, mapping failure to a validation error.
pub fn parse_info_hash(raw: &str) -> Result<InfoHash, ServiceError> {
    InfoHash::from_hex(raw.trim()).map_err(|_| ServiceError::validation("InfoHash not valid"))
}

/// Where a session should come from.
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub info_hash: Option<String>,
    pub magnet: Option<String>,
    pub display_names: Vec<String>,
    pub trackers: Vec<String>,
}

impl SessionQuery {
    pub fn identifier(info_hash: &str) -> Self {
        Self {
            info_hash: Some(info_hash.to_string()),
            ..Self::default()
        }
    }

    pub fn magnet(uri: &str) -> Self {
        Self {
            magnet: Some(uri.to_string()),
            ..Self::default()
        }
    }

    fn has_extras(&self) -> bool {
        !self.display_names.is_empty() || !self.trackers.is_empty()
    }
}

/// Looks up or registers sessions and waits for their metadata.
///
/// Metadata waits end early when the shutdown token fires, and after
/// `metadata_timeout` when one is configured.
#[derive(Clone)]
pub struct SessionResolver {
    engine: Arc<dyn TorrentEngine>,
    metadata_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl SessionResolver {
    pub fn new(
        engine: Arc<dyn TorrentEngine>,
        metadata_timeout: Option<Duration>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            metadata_timeout,
            shutdown,
        }
    }

    /// Resolves `query` to a session whose file list is available.
    ///
    /// An identifier wins over a magnet. An identifier alone only finds
    /// already-registered sessions; with display names or trackers it
    /// registers (or joins) the session through the engine.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` - neither source given, or bad identifier
    /// - `ServiceError::TorrentNotFound` - identifier not registered
    /// - `ServiceError::Engine` - engine rejected the add
    /// - `ServiceError::MetadataCancelled` / `MetadataTimeout` - wait cut short
    pub async fn resolve(
        &self,
        query: &SessionQuery,
    ) -> Result<Arc<dyn TorrentHandle>, ServiceError> {
        let handle = self.locate(query).await?;
        self.await_metadata(&handle).await?;
        Ok(handle)
    }

    async fn locate(&self, query: &SessionQuery) -> Result<Arc<dyn TorrentHandle>, ServiceError> {
        let identifier = query.info_hash.as_deref().filter(|raw| !raw.trim().is_empty());
        let magnet_uri = query.magnet.as_deref().filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = identifier {
            let info_hash = parse_info_hash(raw)?;
            if magnet_uri.is_some() {
                debug!("Both InfoHash and Magnet supplied, using InfoHash {}", info_hash);
            }
            if query.has_extras() {
                let spec = TorrentSpec {
                    info_hash,
                    display_name: query.display_names.first().cloned(),
                    trackers: query.trackers.clone(),
                };
                return Ok(self.engine.add_spec(spec).await?);
            }
            return self
                .engine
                .torrent(&info_hash)
                .ok_or(ServiceError::TorrentNotFound { info_hash });
        }

        let Some(uri) = magnet_uri else {
            return Err(ServiceError::validation("InfoHash or Magnet is not provided"));
        };
        let uri = magnet::with_query_params(
            uri,
            query.display_names.iter().map(String::as_str),
            query.trackers.iter().map(String::as_str),
        );
        let handle = self.engine.add_magnet(&uri).await?;
        info!("Registered magnet for {}", handle.info_hash());
        Ok(handle)
    }

    /// Blocks until `handle` has metadata, shutdown, or the configured timeout.
    pub async fn await_metadata(
        &self,
        handle: &Arc<dyn TorrentHandle>,
    ) -> Result<(), ServiceError> {
        if handle.has_metadata() {
            return Ok(());
        }
        let info_hash = handle.info_hash();
        debug!("Waiting for metadata of {}", info_hash);

        let bounded = async {
            match self.metadata_timeout {
                Some(limit) => tokio::time::timeout(limit, handle.wait_metadata())
                    .await
                    .map_err(|_| ServiceError::MetadataTimeout { info_hash })?,
                None => handle.wait_metadata().await,
            }
            .map_err(|err| match err {
                EngineError::Dropped { info_hash } => ServiceError::TorrentNotFound { info_hash },
                other => ServiceError::Engine(other),
            })
        };

        tokio::select! {
            result = bounded => result,
            () = self.shutdown.cancelled() => {
                debug!("Metadata wait for {} cancelled", info_hash);
                Err(ServiceError::MetadataCancelled { info_hash })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torrent::test_mocks::{MockEngine, MockFile};

    const HEX: &str = "0123456789abcdef0123456789abcdef01234567";

    fn resolver(engine: Arc<MockEngine>) -> SessionResolver {
        SessionResolver::new(engine, None, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_identifier_lookup_requires_registration() {
        let engine = Arc::new(MockEngine::new());
        let resolver = resolver(Arc::clone(&engine));

        let err = resolver
            .resolve(&SessionQuery::identifier(HEX))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::TorrentNotFound { .. }));
        assert_eq!(engine.add_calls(), 0);

        let info_hash = InfoHash::from_hex(HEX).unwrap();
        engine.seed(info_hash, "movie", vec![MockFile::complete("movie.mp4", b"abc")]);
        let handle = resolver.resolve(&SessionQuery::identifier(HEX)).await.unwrap();
        assert_eq!(handle.info_hash(), info_hash);
    }

    #[tokio::test]
    async fn test_invalid_identifier_is_validation_error() {
        let resolver = resolver(Arc::new(MockEngine::new()));
        let err = resolver
            .resolve(&SessionQuery::identifier("short"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_missing_sources_is_validation_error() {
        let resolver = resolver(Arc::new(MockEngine::new()));
        let err = resolver.resolve(&SessionQuery::default()).await.err().unwrap();
        assert_eq!(err.to_string(), "InfoHash or Magnet is not provided");
    }

    #[tokio::test]
    async fn test_identifier_with_extras_registers_spec() {
        let engine = Arc::new(MockEngine::new());
        let resolver = resolver(Arc::clone(&engine));
        let query = SessionQuery {
            info_hash: Some(HEX.to_string()),
            magnet: Some("magnet:?xt=urn:btih:ignored".to_string()),
            display_names: vec!["Name".to_string()],
            trackers: vec!["udp://t:1".to_string()],
        };
        let handle = resolver.locate(&query).await.unwrap();
        assert_eq!(handle.info_hash().to_hex(), HEX);

        let spec = engine.last_spec().unwrap();
        assert_eq!(spec.display_name.as_deref(), Some("Name"));
        assert_eq!(spec.trackers, vec!["udp://t:1".to_string()]);
        assert!(engine.last_magnet().is_none());
    }

    #[tokio::test]
    async fn test_magnet_gets_extra_params_merged() {
        let engine = Arc::new(MockEngine::new());
        let resolver = resolver(Arc::clone(&engine));
        let query = SessionQuery {
            magnet: Some(format!("magnet:?xt=urn:btih:{HEX}")),
            display_names: vec!["My Show".to_string()],
            trackers: vec!["udp://tr.example:80".to_string()],
            ..SessionQuery::default()
        };
        resolver.locate(&query).await.unwrap();
        assert_eq!(
            engine.last_magnet().unwrap(),
            format!("magnet:?xt=urn:btih:{HEX}&dn=My%20Show&tr=udp%3A%2F%2Ftr.example%3A80")
        );
    }

    #[tokio::test]
    async fn test_wait_resumes_on_metadata() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = InfoHash::from_hex(HEX).unwrap();
        let torrent = engine.seed_with(
            info_hash,
            "pending",
            vec![MockFile::empty("a.mkv", b"x")],
            false,
        );
        let resolver = resolver(Arc::clone(&engine));

        let waiter = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver
                    .resolve(&SessionQuery::identifier(HEX))
                    .await
                    .map(|h| h.files().len())
            })
        };
        tokio::task::yield_now().await;
        torrent.publish_metadata();
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_wait() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = InfoHash::from_hex(HEX).unwrap();
        engine.seed_with(info_hash, "pending", Vec::new(), false);
        let shutdown = CancellationToken::new();
        let resolver = SessionResolver::new(engine, None, shutdown.clone());

        shutdown.cancel();
        let err = resolver
            .resolve(&SessionQuery::identifier(HEX))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::MetadataCancelled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_wait() {
        let engine = Arc::new(MockEngine::new());
        let info_hash = InfoHash::from_hex(HEX).unwrap();
        engine.seed_with(info_hash, "pending", Vec::new(), false);
        let resolver =
            SessionResolver::new(engine, Some(Duration::from_secs(5)), CancellationToken::new());

        let err = resolver
            .resolve(&SessionQuery::identifier(HEX))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::MetadataTimeout { .. }));
    }
}
