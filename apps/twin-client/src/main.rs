//! Twin Client - headless terminal client for the Agentic Twin backend.
//!
//! Follows the live event feed, prints the chat/log panel and dashboard to
//! stdout, and sends every line typed on stdin to the backend as a command.

mod config;
mod input;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use twin_core::map::LoggingMapAdapter;
use twin_core::notify::LoggingSpeaker;
use twin_core::protocol_constants::NOTIFICATION_CHANNEL_CAPACITY;
use twin_core::{
    bootstrap_client, BroadcastEvent, BroadcastNotificationBridge, ClientAdapters, ErrorCode,
    TwinClient,
};

use crate::config::AppConfig;
use crate::input::Input;

/// Twin Client - terminal front-end for the logistics digital twin.
#[derive(Parser, Debug)]
#[command(name = "twin-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config file and TWIN_BACKEND_URL).
    #[arg(short = 'b', long)]
    backend_url: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "TWIN_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Start with spoken notifications on.
    #[arg(long)]
    voice: bool,

    /// Start with auto-zoom off.
    #[arg(long)]
    no_auto_zoom: bool,

    /// Reconnect delay in milliseconds (overrides config file).
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,
}

/// Clarify options from the most recent chat entry that offered any.
type PendingOptions = Arc<Mutex<Vec<String>>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Twin Client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.backend_url {
        config.backend_url = url;
    }
    if let Some(ms) = args.reconnect_delay_ms {
        config.reconnect_delay_ms = ms;
    }
    if args.voice {
        config.voice = true;
    }
    if args.no_auto_zoom {
        config.auto_zoom = false;
    }

    let core_config = config.to_core_config()?;
    log::info!(
        "Configuration: backend={}, reconnect_delay={}ms, health_check={}",
        core_config.backend_url,
        core_config.reconnect_delay_ms,
        core_config.health_check.is_some()
    );

    let bridge = Arc::new(BroadcastNotificationBridge::new(NOTIFICATION_CHANNEL_CAPACITY));
    let pending: PendingOptions = Arc::new(Mutex::new(Vec::new()));
    let printer = spawn_printer(&bridge, Arc::clone(&pending));

    let adapters = ClientAdapters {
        map: Arc::new(LoggingMapAdapter),
        sink: bridge,
        speaker: Arc::new(LoggingSpeaker),
    };
    let mut client = bootstrap_client(&core_config, adapters)
        .await
        .context("Failed to bootstrap client")?;

    let trucks = client.fleet.lock().len();
    if trucks > 0 {
        println!("· {trucks} truck(s) on the road");
    }
    println!("Type a command, /voice, /zoom, /<n> to pick an option, or /quit.");
    let outcome = run_input_loop(&mut client, &pending).await;

    log::info!("Shutting down...");
    let shutdown = client.shutdown().await;
    printer.abort();

    outcome?;
    if let Err(e) = &shutdown {
        log::error!("Shutdown failed [{}]: {}", e.code(), e);
    }
    shutdown.context("Live feed stopped")?;
    log::info!("Shutdown complete");
    Ok(())
}

/// Reads stdin until `/quit`, EOF, a shutdown signal or the feed giving up.
async fn run_input_loop(client: &mut TwinClient, pending: &PendingOptions) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown signal received");
                return Ok(());
            }
            result = client.feed_finished() => {
                if let Err(e) = &result {
                    log::error!("Live feed stopped [{}]: {}", e.code(), e);
                }
                return result.context("Live feed stopped");
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        log::warn!("Failed to read stdin: {}", e);
                        return Ok(());
                    }
                };
                if !handle_input(client, pending, Input::parse(&line)) {
                    return Ok(());
                }
            }
        }
    }
}

/// Applies one input line. Returns `false` on quit.
fn handle_input(client: &TwinClient, pending: &PendingOptions, input: Input) -> bool {
    match input {
        Input::Quit => return false,
        Input::Empty => {}
        Input::ToggleVoice => {
            let on = client.session.toggle_voice();
            println!("· voice {}", if on { "on" } else { "off" });
        }
        Input::ToggleZoom => {
            let on = client.session.toggle_auto_zoom();
            println!("· auto-zoom {}", if on { "on" } else { "off" });
        }
        Input::Choose(n) => {
            let option = pending.lock().get(n - 1).cloned();
            match option {
                Some(text) => send_command(client, text),
                None => println!("· no option {n}"),
            }
        }
        Input::Command(text) => send_command(client, text),
    }
    true
}

fn send_command(client: &TwinClient, text: String) {
    let commands = client.commands.clone();
    tokio::spawn(async move {
        commands.send(&text).await;
    });
}

/// Prints everything the bridge broadcasts.
fn spawn_printer(bridge: &BroadcastNotificationBridge, pending: PendingOptions) -> JoinHandle<()> {
    let mut rx = bridge.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(BroadcastEvent::Notification(n)) => {
                    if !n.options().is_empty() {
                        *pending.lock() = n.options().to_vec();
                    }
                    println!("{}", render::notification(&n));
                }
                Ok(BroadcastEvent::Dashboard(table)) => {
                    println!("{}", render::dashboard(&table));
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Printer lagged, skipped {} notification(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
