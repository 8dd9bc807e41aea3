//! Connection status enumeration.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the single WebSocket connection.
///
/// Exactly one value is current at any instant.  Within one connection
/// attempt the transitions are monotonic: a fresh connection always passes
/// through [`Connecting`](ConnectionStatus::Connecting) before reaching
/// [`Connected`](ConnectionStatus::Connected), and a user-requested close
/// passes through [`Closing`](ConnectionStatus::Closing) before
/// [`Disconnected`](ConnectionStatus::Disconnected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// No transport has ever been created (or the last attempt failed before
    /// one existed).
    NotInitialized,
    /// A connection attempt is in flight.
    Connecting,
    /// The transport is open and frames can be sent.
    Connected,
    /// A user-requested close has been issued; waiting for the transport to
    /// wind down.
    Closing,
    /// The transport has closed (remote close, local close, or failure after
    /// being open).
    Disconnected,
}

impl ConnectionStatus {
    /// `true` while a transport exists or is being established.
    ///
    /// Used by the guards that reject a second `connect` call.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Closing => "CLOSING",
            Self::Disconnected => "DISCONNECTED",
        };
        f.write_str(s)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
