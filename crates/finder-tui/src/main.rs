mod action;
mod app;
mod app_state;
mod cache;
mod component;
mod components;
mod core;
mod debounce;
mod dispatch;
mod gate;
mod http;
mod sources;
mod theme;
mod widgets;

use tokio::sync::{broadcast, mpsc};

/// What the SearchCore broadcasts.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// A channel's snapshot changed; receivers re-read the SearchStore.
    ChannelUpdated(String),
    /// A log line for the status bar.
    Log(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = finder_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = finder_proto::platform::log_file();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("finder log: {}", log_path.display());

    tracing::info!("finder starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match finder_proto::config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config unusable, falling back to defaults: {:#}", e);
            finder_proto::config::Config::default()
        }
    };

    // ── Broadcast channel (SearchCore → TUI) ─────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── SearchEvent channel (debouncers/TUI/HTTP/requests → SearchCore) ──────
    let (event_tx, event_rx) = mpsc::channel::<core::SearchEvent>(1024);

    // ── Build SearchCore ─────────────────────────────────────────────────────
    let client = sources::build_client(&config.search)?;
    let (search_core, handle) =
        core::SearchCore::from_config(&config, client, broadcast_tx.clone(), event_tx);
    let store = search_core.store();

    // ── HTTP server ──────────────────────────────────────────────────────────
    if config.http.enabled {
        http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            store.clone(),
            handle.clone(),
        );
    }

    // ── Spawn SearchCore event loop ──────────────────────────────────────────
    tokio::spawn(async move {
        if let Err(e) = search_core.run(event_rx).await {
            tracing::error!("SearchCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(handle, store).await;
    app.run(broadcast_rx).await?;

    Ok(())
}
