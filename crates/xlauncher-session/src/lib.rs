//! # xlauncher-session
//!
//! WebSocket connection and session core for the xlauncher remote launcher.
//!
//! The xlauncher front-ends (app launcher, remote-screen viewer, debugging
//! console) all talk to the launcher server over a single WebSocket
//! connection.  This crate owns that connection and everything around it:
//! the connection lifecycle, the event fan-out to interested consumers, and
//! the session façade that view code calls into.
//!
//! # Architecture
//!
//! ```text
//! UI / console
//!         ↕  commands + log/status/error reads
//! [xlauncher-session]
//!   ├── domain/           Pure types: status, log entries, wire commands
//!   ├── application/      Session façade (guarded commands, message log)
//!   └── infrastructure/
//!         ├── events/     Listener registry + event vocabulary
//!         └── connection/ ConnectionManager (tokio-tungstenite client)
//!         ↕
//! launcher server  (JSON text frames + binary screen frames, WebSocket)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O, no async, and no transport dependencies.
//! - `application` depends on `domain` and `infrastructure` but never touches
//!   the socket directly.
//! - `infrastructure` is the only layer that imports `tokio-tungstenite`.
//!
//! Data flow: a UI command goes through the [`Session`] guard, down to the
//! [`ConnectionManager`], and onto the network.  A network event travels the
//! other way: the manager translates the raw frame into a
//! [`ConnectionEvent`], the session's listeners append log entries, and the
//! consumer re-reads `status` / `messages` / `error`.

/// Domain layer: pure business-logic types (no I/O).
pub mod domain;

/// Application layer: the session façade consumed by view code.
pub mod application;

/// Infrastructure layer: connection manager and event fan-out.
pub mod infrastructure;

// Re-export the most-used types at the crate root so callers can write
// `xlauncher_session::Session` instead of spelling out the module path.
pub use application::session::{Session, SessionConfig};
pub use domain::log::{Direction, EncodeError, MessageLogEntry, Payload};
pub use domain::messages::WireCommand;
pub use domain::status::ConnectionStatus;
pub use infrastructure::connection::{ConnectionManager, ManagerConfig};
pub use infrastructure::events::{ConnectionEvent, EventKind, ListenerRegistry, Subscription};
