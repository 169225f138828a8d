//! Tutor binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Build the HTTP backend (and the local history store when offline)
//! 3. Wire the session orchestrator to a terminal viewer
//! 4. Run the requested subcommand

mod cli;
mod commands;
mod render;
mod viewer;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use tutor_client::HttpBackend;
use tutor_core::backend::{HistoryStore, StaticCredentials};
use tutor_core::config::TutorConfig;
use tutor_session::SessionOrchestrator;
use tutor_storage::{Database, SqliteHistoryStore};

use crate::cli::CliArgs;
use crate::viewer::TerminalViewer;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn open_local_store(
    config: &TutorConfig,
    data_dir: &str,
) -> Result<Arc<SqliteHistoryStore>, Box<dyn std::error::Error>> {
    let data_dir = resolve_data_dir(data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join(&config.storage.history_db);
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "Local history database opened");
    Ok(Arc::new(SqliteHistoryStore::new(Arc::new(db))))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = TutorConfig::load_or_default(&config_file);
    config.backend.base_url = args.resolve_base_url(&config.backend.base_url);

    // Tracing. Logs go to stderr so answers on stdout stay clean.
    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting tutor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), base_url = %config.backend.base_url, "Configuration loaded");

    // Backend.
    let backend = Arc::new(HttpBackend::new(&config.backend)?);

    // History store: the backend itself, or the local database when offline.
    let store: Arc<dyn HistoryStore> = if args.resolve_offline(config.storage.offline_history) {
        let data_dir = args
            .resolve_data_dir()
            .unwrap_or_else(|| config.general.data_dir.clone());
        open_local_store(&config, &data_dir)?
    } else {
        backend.clone()
    };

    let session = SessionOrchestrator::new(
        backend,
        store,
        Arc::new(TerminalViewer),
        Arc::new(StaticCredentials(args.resolve_credentials())),
        config.session.clone(),
    );

    if let Err(err) = commands::run(&session, config.session.preview_chars, args.command).await {
        commands::report(&err);
        std::process::exit(1);
    }

    Ok(())
}
