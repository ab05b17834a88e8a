//! CLI entrypoint for crs-store
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use crs_application::{
    ConversationStore, ExportConversationsUseCase, ExportInput, HandleMessageUseCase,
    SessionStore, StorageBackend, StoreSettings, SweepSessionsUseCase,
};
use crs_domain::SessionKey;
use crs_infrastructure::{
    ConfigLoader, ExportTarget, ExportWriter, FileConfig, HealthServer, PlaceholderResponder,
    connect_backend,
};
use crs_presentation::{ChatRepl, Cli, Command, ConsoleFormatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Everything a subcommand may need, built once at startup.
struct App {
    config: FileConfig,
    settings: StoreSettings,
    backend: Arc<dyn StorageBackend>,
    sessions: Arc<SessionStore>,
    conversations: Arc<ConversationStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so logging.file can take effect
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
    }
    .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.logging.file.as_ref().map(PathBuf::from));
    let _log_guard = init_logging(cli.verbose, log_file.as_deref())?;

    if let Command::ShowConfig = cli.command {
        return show_config(&config, cli.config.as_ref());
    }

    if let Err(problems) = config.validate() {
        let list = problems
            .iter()
            .map(|p| format!("  - {p}"))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Invalid configuration:\n{list}");
    }

    info!(backend = %config.storage.backend, "Starting crs-store");

    // === Dependency Injection ===
    let backend = connect_backend(&config.storage)
        .await
        .context("Failed to connect storage backend")?;
    let settings = config.store_settings();
    let sessions = Arc::new(
        SessionStore::new(backend.clone()).with_default_ttl(settings.session_ttl_chrono()),
    );
    let conversations = Arc::new(ConversationStore::new(backend.clone()));

    let app = App {
        config,
        settings,
        backend: backend.clone(),
        sessions,
        conversations,
    };

    let result = run(&app, cli.command).await;

    if let Err(e) = backend.close().await {
        warn!(error = %e, "Failed to close storage backend");
    }
    result
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Serve { bind } => serve(app, bind).await,
        Command::Chat { session } => {
            let key = match session {
                Some(key) => SessionKey::new(key)?,
                None => SessionKey::new(uuid::Uuid::new_v4().to_string())?,
            };
            let use_case = HandleMessageUseCase::new(
                app.sessions.clone(),
                app.conversations.clone(),
                Arc::new(PlaceholderResponder::new()),
            )
            .with_max_history(app.settings.max_history);

            ChatRepl::new(Arc::new(use_case), key).run().await?;
            Ok(())
        }
        Command::Export {
            format,
            output,
            filter,
            limit,
        } => {
            let mut input = ExportInput::new(format.into()).with_filter(filter.to_filter()?);
            if let Some(limit) = limit {
                input = input.with_limit(limit);
            }
            if let Some(prompt) = &app.config.export.chatml_system_prompt {
                input = input.with_system_prompt(prompt.clone());
            }

            let export = ExportConversationsUseCase::new(app.conversations.clone())
                .execute(input)
                .await?;
            let writer = ExportWriter::new(ExportTarget::from_option(output.as_deref()));
            let written = writer.write_lines(&export.lines)?;
            if let ExportTarget::File(path) = writer.target() {
                eprintln!(
                    "Exported {} conversations ({} lines, {}) to {}",
                    export.conversations,
                    written,
                    export.format,
                    path.display()
                );
            }
            Ok(())
        }
        Command::Stats { filter, json } => {
            let stats = app
                .conversations
                .get_statistics(&filter.to_filter()?)
                .await?;
            let output = if json {
                ConsoleFormatter::format_statistics_json(&stats)
            } else {
                ConsoleFormatter::format_statistics(&stats)
            };
            println!("{}", output);
            Ok(())
        }
        Command::List {
            filter,
            page_size,
            page_token,
        } => {
            let page = app
                .conversations
                .list_conversations(&filter.to_filter()?, page_token.as_deref(), page_size)
                .await?;
            print!("{}", ConsoleFormatter::format_page(&page));
            Ok(())
        }
        Command::Sweep => {
            let removed = app.sessions.sweep_expired().await?;
            println!("Removed {} expired sessions", removed);
            Ok(())
        }
        // Handled before the backend is connected
        Command::ShowConfig => Ok(()),
    }
}

/// Health endpoint plus the periodic sweep, until Ctrl-C.
async fn serve(app: &App, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| app.config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {bind}"))?;

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        ctrl_c.cancel();
    });

    let sweeper = app.settings.sweep_interval.map(|interval| {
        SweepSessionsUseCase::new(app.sessions.clone()).spawn(interval, shutdown.clone())
    });

    let server = HealthServer::new(app.backend.clone())
        .with_check_backend(app.config.server.check_backend);
    let served = server.run(addr, shutdown.clone()).await;
    shutdown.cancel();

    if let Some(handle) = sweeper
        && let Err(e) = handle.await
    {
        warn!(error = %e, "Sweep task ended abnormally");
    }
    served.with_context(|| format!("Failed to bind {addr}"))
}

fn show_config(config: &FileConfig, explicit: Option<&PathBuf>) -> Result<()> {
    ConfigLoader::print_config_sources(explicit);
    println!();
    println!("Effective configuration:");
    println!("{}", toml::to_string_pretty(config)?);
    if let Err(problems) = config.validate() {
        for problem in problems {
            println!("warning: {problem}");
        }
    }
    Ok(())
}

/// Console logging by verbosity, plus an optional log file.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s
/// work.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log file has no name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Could not create {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
