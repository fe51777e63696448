//! CLI command implementations

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use tidecast_core::config::parse_listen_addr;
use tidecast_core::tracing_setup::{CliLogLevel, init_tracing};
use tidecast_core::{TidecastConfig, TorrentService};
use tidecast_sim::{Catalog, SimEngine, SimEngineConfig};
use tidecast_web::run_server;
use tracing::{info, warn};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP streaming server
    Serve(ServeArgs),
    /// List the torrents a content library would seed
    Catalog {
        /// Library directory to scan
        #[arg(long)]
        library: PathBuf,
    },
}

/// Flags for `tidecast serve`. Unset flags fall back to the environment.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on, `host:port` or `:port`
    #[arg(short, long, value_parser = parse_listen_addr)]
    pub listen: Option<SocketAddr>,

    /// Directory downloads are written to
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Disable uploading to peers
    #[arg(long)]
    pub noup: bool,

    /// Library directory the simulated swarm seeds from
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Console log level; RUST_LOG takes precedence
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: CliLogLevel,

    /// Also write trace-level logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ServeArgs {
    /// Layers the flags over `base`.
    pub fn apply(&self, mut base: TidecastConfig) -> TidecastConfig {
        if let Some(listen) = self.listen {
            base.server.listen_addr = listen;
        }
        if let Some(dir) = &self.data_dir {
            base.storage.data_dir = dir.clone();
        }
        if self.noup {
            base.engine.no_upload = true;
        }
        if let Some(library) = &self.library {
            base.engine.library_dir = Some(library.clone());
        }
        base
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns the error of whichever command fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve(args) => serve(args).await,
        Commands::Catalog { library } => print_catalog(&library).await,
    }
}

/// Runs the server until Ctrl-C or SIGTERM, then sweeps every session.
///
/// # Errors
/// - Tracing, data directory or library setup failed
/// - The listener could not be bound
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    init_tracing(args.log_level.as_tracing_level(), args.log_file.as_deref())
        .context("failed to initialize logging")?;

    let config = args.apply(TidecastConfig::from_env());
    tokio::fs::create_dir_all(&config.storage.data_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create data directory {}",
                config.storage.data_dir.display()
            )
        })?;

    let catalog = match &config.engine.library_dir {
        Some(dir) => Catalog::scan_dir(dir)
            .await
            .with_context(|| format!("failed to scan library {}", dir.display()))?,
        None => {
            warn!("No library configured, metadata will never arrive for any torrent");
            Catalog::new()
        }
    };

    let engine = Arc::new(SimEngine::new(Arc::new(catalog), SimEngineConfig::from(&config)));
    let service = Arc::new(TorrentService::new(engine, &config));
    info!("Serving data from {}", config.storage.data_dir.display());

    let served = run_server(
        config.server.listen_addr,
        Arc::clone(&service),
        shutdown_signal(),
    )
    .await;

    let removed = service.shutdown().await;
    info!("Removed {} session(s) on shutdown", removed);

    served.with_context(|| format!("server on {} failed", config.server.listen_addr))
}

/// Prints every torrent the library would seed.
///
/// # Errors
/// - The library directory could not be read
pub async fn print_catalog(library: &Path) -> anyhow::Result<()> {
    let catalog = Catalog::scan_dir(library)
        .await
        .with_context(|| format!("failed to scan library {}", library.display()))?;

    if catalog.is_empty() {
        println!("No torrents in {}", library.display());
        return Ok(());
    }

    for entry in catalog.entries() {
        println!("{}", entry.name);
        println!("  InfoHash: {}", entry.info_hash);
        println!(
            "  Size:     {} bytes in {} file(s)",
            entry.total_size(),
            entry.files.len()
        );
        println!("  Magnet:   {}", entry.magnet_link());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Commands {
        TestCli::try_parse_from(std::iter::once("tidecast").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_serve_flags_override_config() {
        let Commands::Serve(args) = parse(&[
            "serve",
            "-l",
            ":8080",
            "-d",
            "/srv/tidecast",
            "--noup",
            "--library",
            "/srv/media",
            "--log-level",
            "debug",
        ]) else {
            panic!("expected serve");
        };

        let config = args.apply(TidecastConfig::default());
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/tidecast"));
        assert!(config.engine.no_upload);
        assert_eq!(config.engine.library_dir, Some(PathBuf::from("/srv/media")));
        assert_eq!(args.log_level.as_tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_unset_flags_keep_base() {
        let Commands::Serve(args) = parse(&["serve"]) else {
            panic!("expected serve");
        };
        let mut base = TidecastConfig::default();
        base.engine.no_upload = true;

        let config = args.apply(base.clone());
        assert_eq!(config.server.listen_addr, base.server.listen_addr);
        assert_eq!(config.storage.data_dir, base.storage.data_dir);
        assert!(config.engine.no_upload);
    }

    #[test]
    fn test_invalid_listen_address_is_rejected() {
        let parsed = TestCli::try_parse_from(["tidecast", "serve", "--listen", "nowhere"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_catalog_scans_library() {
        let library = tempfile::tempdir().unwrap();
        std::fs::write(library.path().join("clip.mp4"), b"bytes").unwrap();
        assert!(print_catalog(library.path()).await.is_ok());
        assert!(print_catalog(&library.path().join("missing")).await.is_err());
    }
}
