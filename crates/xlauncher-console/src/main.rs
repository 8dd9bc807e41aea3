//! xlauncher console — interactive client for the xlauncher WebSocket backend.
//!
//! The console owns one [`ConnectionManager`] and one [`Session`], connects to
//! the backend, and then turns stdin lines into outbound traffic:
//!
//! - a line starting with `/` is a console command (see below),
//! - a line that parses as JSON is sent as a structured message,
//! - any other line is sent as raw text.
//!
//! Incoming traffic, connection transitions, and errors are printed as they
//! land in the session's message log.  Binary frames (screen-share data) are
//! not printed; the console reports their sizes through the manager's
//! broadcast channel instead.
//!
//! # Usage
//!
//! ```text
//! xlauncher-console [OPTIONS]
//!
//! Options:
//!   --url <URL>   Backend WebSocket URL [default: ws://127.0.0.1:8765]
//! ```
//!
//! # Console commands
//!
//! | Command          | Effect                                         |
//! |------------------|------------------------------------------------|
//! | `/quit`          | Disconnect and exit                            |
//! | `/status`        | Print connection status and the last error     |
//! | `/clear`         | Clear the message log                          |
//! | `/connect [URL]` | Connect (to URL, or the configured default)    |
//! | `/disconnect`    | Close the current connection                   |
//! | `/apps`          | Request the application list                   |
//! | `/launch <PATH>` | Launch the application at PATH                 |
//! | `/close <ID>`    | Close the running application with id ID       |
//!
//! # Environment variable overrides
//!
//! | Variable           | Default                | Description           |
//! |--------------------|------------------------|-----------------------|
//! | `XLAUNCHER_WS_URL` | `ws://127.0.0.1:8765`  | Backend WebSocket URL |

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use xlauncher_session::{
    ConnectionEvent, ConnectionManager, EventKind, ManagerConfig, Payload, Session, SessionConfig,
    Subscription, WireCommand,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Interactive console client for the xlauncher WebSocket backend.
#[derive(Debug, Parser)]
#[command(
    name = "xlauncher-console",
    about = "Interactive console client for the xlauncher WebSocket backend",
    version
)]
struct Cli {
    /// WebSocket URL of the xlauncher backend.
    #[arg(long, default_value = "ws://127.0.0.1:8765", env = "XLAUNCHER_WS_URL")]
    url: String,
}

// ── Event rendering ───────────────────────────────────────────────────────────

/// Registers print listeners for every event kind the manager emits.
///
/// The session registers its own listeners first, so by the time these run
/// the message log already contains the corresponding entry.  The returned
/// subscriptions must be kept alive for the lifetime of the console.
fn register_printers(manager: &Arc<ConnectionManager>) -> Vec<Subscription> {
    vec![
        manager.add_listener(EventKind::Connect, |event| {
            if let ConnectionEvent::Connect { id } = event {
                println!("* connected (id {id})");
            }
        }),
        manager.add_listener(EventKind::Disconnect, |event| {
            if let ConnectionEvent::Disconnect { reason, code } = event {
                println!("* disconnected: {reason} (code {code})");
            }
        }),
        manager.add_listener(EventKind::Error, |event| {
            if let ConnectionEvent::Error { message } = event {
                println!("! {message}");
            }
        }),
        manager.add_listener(EventKind::Message, |event| {
            if let ConnectionEvent::Message { payload } = event {
                match payload {
                    Payload::Json(value) => println!("< {value}"),
                    Payload::Text(text) => println!("< {text}"),
                }
            }
        }),
    ]
}

/// Drains the manager's binary broadcast channel, reporting frame sizes.
fn spawn_binary_reporter(manager: &Arc<ConnectionManager>) {
    let mut frames = manager.subscribe_binary();
    tokio::spawn(async move {
        loop {
            match frames.recv().await {
                Ok(frame) => info!("binary frame received: {} bytes", frame.len()),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("binary reporter lagged, skipped {skipped} frames");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

// ── Input handling ────────────────────────────────────────────────────────────

/// Handles one stdin line.  Returns `false` when the console should exit.
fn handle_line(session: &Session, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" => {
            session.disconnect();
            return false;
        }
        "/status" => {
            println!("status: {}", session.status());
            match session.error() {
                Some(error) => println!("last error: {error}"),
                None => println!("last error: none"),
            }
        }
        "/clear" => {
            session.clear_messages();
            println!("log cleared");
        }
        "/connect" => {
            let url = (!rest.is_empty()).then_some(rest);
            if !session.connect(url) {
                println!("! connect rejected (already active or bad URL)");
            }
        }
        "/disconnect" => {
            if !session.disconnect() {
                println!("! not connected");
            }
        }
        "/apps" => {
            send(session, WireCommand::ListApps);
        }
        "/launch" => {
            if rest.is_empty() {
                println!("usage: /launch <PATH>");
            } else {
                send(session, WireCommand::launch_app(rest));
            }
        }
        "/close" => {
            if rest.is_empty() {
                println!("usage: /close <ID>");
            } else {
                send(session, WireCommand::close_app(rest));
            }
        }
        unknown if unknown.starts_with('/') => {
            println!("unknown command: {unknown}");
        }
        _ => {
            // Free-form input: structured when it parses as JSON, raw
            // text otherwise.
            let sent = match serde_json::from_str::<serde_json::Value>(line) {
                Ok(value) => session.send_message(value),
                Err(_) => session.send_message(line),
            };
            if !sent {
                report_send_failure(session);
            }
        }
    }
    true
}

fn send(session: &Session, command: WireCommand) {
    if !session.send_command(command) {
        report_send_failure(session);
    }
}

fn report_send_failure(session: &Session) {
    match session.error() {
        Some(error) => println!("! {error}"),
        None => println!("! send failed"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity; default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("xlauncher console starting, backend {}", cli.url);

    let manager = Arc::new(ConnectionManager::new(ManagerConfig::default()));
    let _printers = register_printers(&manager);
    spawn_binary_reporter(&manager);

    let session = Session::new(
        Arc::clone(&manager),
        SessionConfig {
            default_url: cli.url,
        },
    );
    if !session.connect(None) {
        warn!("initial connection attempt rejected; use /connect to retry");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_line(&session, &line) {
                            break;
                        }
                    }
                    // stdin closed (piped input ended).
                    None => {
                        session.disconnect();
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, disconnecting");
                session.disconnect();
                break;
            }
        }
    }

    // Give the close handshake a moment to complete before the runtime
    // drops the connection task.
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!("xlauncher console stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
