//! clipkeep application binary - composition root.
//!
//! Ties the clipkeep crates together into a single executable:
//! 1. Parse the CLI and load configuration from TOML
//! 2. Open the history file and image directory
//! 3. Start the clipboard capture loop
//! 4. Serve the local HTTP API until Ctrl-C
//!
//! The `list`, `search` and `clear` subcommands work on the history file
//! directly and exit.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use clipkeep_api::auth::{load_or_generate_token, TOKEN_FILE};
use clipkeep_api::{start_server, AppState, ClipboardService};
use clipkeep_capture::session;
use clipkeep_capture::{
    ArboardClipboard, CaptureLoop, CaptureSession, ChangeDetector, ClipboardSource, MockClipboard,
};
use clipkeep_core::config::{self, ClipkeepConfig};
use clipkeep_core::events::event_channel;
use clipkeep_core::types::{Entry, EntryKind};
use clipkeep_storage::{BlobStore, HistoryStore};

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ClipkeepConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!(path = %config_file.display(), "Configuration resolved");

    match args.command() {
        Command::Run => {
            let port = args.resolve_port(config.general.port);
            run(config, config_file, port).await
        }
        Command::List { limit, offset } => {
            let history = HistoryStore::open(config.history_path())?;
            print_entries(&history.list(limit, offset));
            Ok(())
        }
        Command::Search { query } => {
            let history = HistoryStore::open(config.history_path())?;
            print_entries(&history.search(&query));
            Ok(())
        }
        Command::Clear => {
            let port = args.resolve_port(config.general.port);
            if cli::instance_running(port).await {
                tracing::error!(port, "clipkeep is running; clear it with POST /history/clear");
                return Err(format!(
                    "clipkeep is running on port {}; its history would overwrite this clear",
                    port
                )
                .into());
            }
            let history = HistoryStore::open(config.history_path())?;
            let removed = history.clear_non_favorites();
            history.flush()?;
            println!("Removed {} entries", removed);
            Ok(())
        }
    }
}

async fn run(
    config: ClipkeepConfig,
    config_file: PathBuf,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting clipkeep v{}", env!("CARGO_PKG_VERSION"));

    // Storage.
    let data_dir = config.data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let history = Arc::new(HistoryStore::open(config.history_path())?);
    let blobs = BlobStore::new(config.images_dir());
    tracing::info!(path = %history.path().display(), "History store opened");

    // Clipboard.
    let source: Arc<dyn ClipboardSource> = match ArboardClipboard::new() {
        Ok(clipboard) => Arc::new(clipboard),
        Err(e) => {
            tracing::warn!(error = %e, "System clipboard unavailable, capture will see an empty clipboard");
            Arc::new(MockClipboard::new())
        }
    };

    let detector = ChangeDetector::shared();
    let capture_session = CaptureSession::shared();
    let events = event_channel();
    let live_config = config::shared(config);

    // === Background capture ===

    let capture = CaptureLoop::new(
        Arc::clone(&history),
        blobs.clone(),
        Arc::clone(&source),
        Arc::clone(&detector),
        Arc::clone(&capture_session),
        events.clone(),
        Arc::clone(&live_config),
    )
    .spawn();

    // === API server ===

    let service = ClipboardService::new(
        Arc::clone(&history),
        blobs,
        source,
        detector,
        Arc::clone(&capture_session),
        events,
        live_config,
    )
    .with_config_path(config_file);

    let token = load_or_generate_token(&data_dir.join(TOKEN_FILE));
    let state = AppState::new(service, token).with_port(port);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    };

    let served = start_server(state, shutdown).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!("Try: clipkeep --port {}", port.saturating_add(1));
    }

    session::lock(&capture_session).stop();
    if let Err(e) = capture.await {
        tracing::warn!(error = %e, "Capture loop ended abnormally");
    }
    if let Err(e) = history.flush() {
        tracing::warn!(error = %e, "Failed to flush history on shutdown");
    }

    tracing::info!("clipkeep stopped");
    served.map_err(Into::into)
}

fn print_entries(entries: &[Entry]) {
    for entry in entries {
        // Image previews are data URLs; the blob path reads better.
        let summary = match entry.kind() {
            EntryKind::Text => entry.preview().replace('\n', " "),
            EntryKind::Image => entry.content().to_string(),
        };
        println!(
            "{}\t{}\t{}\t{}\t{}",
            entry.id,
            if entry.is_favorite { "*" } else { " " },
            entry.kind().as_str(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            summary
        );
    }
}
