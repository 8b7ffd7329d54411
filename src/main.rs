mod config;
mod daemon;
mod debounce;
mod focus_history;
mod ipc;
mod socket_client;
mod socket_server;
mod window_tree;
mod wm_client;
mod wm_ipc;

use anyhow::{Context, Result};
use config::{Command, Config};
use daemon::Daemon;
use ipc::ControlCommand;
use tokio::sync::mpsc;
use tracing::{error, info};
use wm_ipc::{listen_for_window_events, ConnectionManager};

/// Buffered window events between the listener and the dispatch loop
const WINDOW_EVENT_BUFFER: usize = 64;

fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    // Client commands talk to a running daemon and exit
    match config.command() {
        Command::Switch => socket_client::send_command_and_exit(ControlCommand::Last),
        Command::Next => socket_client::send_command_and_exit(ControlCommand::Next),
        Command::Prev => socket_client::send_command_and_exit(ControlCommand::Prev),
        Command::Daemon => {}
    }

    // Initialize logging
    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    info!("Starting focus-last daemon for {:?}", config.wm);
    info!(
        "History size: {}, permanence: {:?}, unique: {}, ignore floating: {}",
        config.history_size, config.permanence, config.unique, config.ignore_floating
    );

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let result = rt.block_on(run_daemon(config));

    if let Err(e) = &result {
        error!("Daemon error: {:#}", e);
    }
    result
}

/// Wire the control socket, the event listener and the dispatch loop together
async fn run_daemon(config: Config) -> Result<()> {
    // Bind first: a second daemon must fail before touching the window manager
    let control_rx = socket_server::start_server(&ipc::socket_name())?;

    let source = config.socket_source();
    let reconnect_timeout = config.reconnect_timeout;
    let daemon = Daemon::new(config).await?;

    let (window_tx, window_rx) = mpsc::channel(WINDOW_EVENT_BUFFER);
    let events = ConnectionManager::new("event", source);
    let listener = tokio::spawn(listen_for_window_events(
        events,
        reconnect_timeout,
        window_tx,
    ));

    tokio::select! {
        result = daemon.run(window_rx, control_rx, listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
