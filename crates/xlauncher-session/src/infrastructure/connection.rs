//! ConnectionManager: owns the single WebSocket transport.
//!
//! The manager guarantees at most one live transport at any time and
//! translates raw tokio-tungstenite activity into the internal
//! [`ConnectionEvent`] vocabulary.  It never touches UI state and never lets
//! an error escape a public operation: every failure becomes a `false`
//! return or an `Error` event.
//!
//! # Task model
//!
//! `connect` spawns one task per attempt.  The task performs the handshake,
//! then splits the stream: outbound frames flow through an unbounded channel
//! into the write half, inbound frames are read in a loop until the stream
//! ends.  Commands (`connect` / `disconnect` / `send_*`) are synchronous and
//! report only the *local* outcome — transport created, close queued, frame
//! queued — never remote acknowledgment.
//!
//! # Stale attempts
//!
//! Each `connect` bumps an epoch.  Status writes from a superseded attempt's
//! tasks are dropped, so a slow or abandoned handshake can never clobber the
//! state of the connection that replaced it.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message as WsMessage,
    },
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::log::Payload;
use crate::domain::status::ConnectionStatus;
use crate::infrastructure::events::{ConnectionEvent, EventKind, ListenerRegistry, Subscription};

/// Close reason sent with a user-requested disconnect (normal closure, 1000).
const USER_CLOSE_REASON: &str = "Disconnect requested by user";

/// Fallback close reason when the server closes without one.
const DEFAULT_CLOSE_REASON: &str = "Connection closed";

/// WebSocket close code for an abnormal termination (no close frame seen).
const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Configuration for a [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Capacity of the process-wide binary-frame broadcast channel.
    ///
    /// Slow subscribers that fall more than this many frames behind start
    /// losing the oldest frames — acceptable for a live screen stream.
    pub binary_broadcast_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            binary_broadcast_capacity: 32,
        }
    }
}

/// Mutable manager state, guarded by one mutex.
struct ManagerState {
    status: ConnectionStatus,
    /// Outbound frame queue of the live transport; `None` whenever no
    /// transport is owned.
    outbound: Option<mpsc::UnboundedSender<WsMessage>>,
    /// Bumped by every `connect`; tasks from older attempts may no longer
    /// write status.
    epoch: u64,
}

/// State and channels shared with the connection tasks.
struct ManagerShared {
    state: Mutex<ManagerState>,
    registry: Arc<ListenerRegistry>,
    binary_tx: broadcast::Sender<Vec<u8>>,
}

impl ManagerShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets `status` (and drops the outbound handle) only if `epoch` is
    /// still current.  Returns whether the write happened.
    fn finalize(&self, epoch: u64, status: ConnectionStatus) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            return false;
        }
        state.status = status;
        state.outbound = None;
        true
    }
}

/// Owns the single WebSocket transport and the listener fan-out.
///
/// Construct one long-lived instance per application and share it behind an
/// `Arc`; tests can create as many independent instances as they need.
/// Requires a running Tokio runtime (connection tasks are spawned on it).
pub struct ConnectionManager {
    shared: Arc<ManagerShared>,
}

impl ConnectionManager {
    /// Creates a manager with no transport (`NOT_INITIALIZED`).
    pub fn new(config: ManagerConfig) -> Self {
        let (binary_tx, _) = broadcast::channel(config.binary_broadcast_capacity.max(1));
        Self {
            shared: Arc::new(ManagerShared {
                state: Mutex::new(ManagerState {
                    status: ConnectionStatus::NotInitialized,
                    outbound: None,
                    epoch: 0,
                }),
                registry: Arc::new(ListenerRegistry::new()),
                binary_tx,
            }),
        }
    }

    /// Current authoritative connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status
    }

    /// Registers a callback for one event kind; the returned [`Subscription`]
    /// unsubscribes it (idempotently, or on drop).
    pub fn add_listener(
        &self,
        kind: EventKind,
        callback: impl Fn(&ConnectionEvent) + Send + Sync + 'static,
    ) -> Subscription {
        ListenerRegistry::subscribe(&self.shared.registry, kind, callback)
    }

    /// Subscribes to the process-wide binary frame broadcast.
    ///
    /// Binary frames (streamed screen captures) are delivered here *in
    /// addition to* the `BinaryMessage` listener event, so view code far from
    /// the session — a screen viewer, say — can consume them without being
    /// wired through the session's subscriber chain.
    pub fn subscribe_binary(&self) -> broadcast::Receiver<Vec<u8>> {
        self.binary_tx().subscribe()
    }

    fn binary_tx(&self) -> &broadcast::Sender<Vec<u8>> {
        &self.shared.binary_tx
    }

    /// Starts a connection attempt to `url`.
    ///
    /// Idempotent while a transport is open or opening: returns `true`
    /// without creating a second one.  Returns `false` only when the client
    /// request cannot even be constructed (an unparseable URL).  The network
    /// outcome arrives later as a `Connect` or `Error` event.
    pub fn connect(&self, url: &str) -> bool {
        let request = match url.into_client_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("invalid WebSocket URL '{url}': {e}");
                return false;
            }
        };

        let epoch = {
            let mut state = self.shared.lock();
            if state.status.is_active() {
                debug!("connect ignored: transport already {}", state.status);
                return true;
            }
            state.epoch += 1;
            state.status = ConnectionStatus::Connecting;
            state.outbound = None;
            state.epoch
        };

        debug!("connecting to {url}");
        let shared = Arc::clone(&self.shared);
        tokio::spawn(run_connection(shared, request, epoch));
        true
    }

    /// Issues a normal closure (code 1000) for the open transport.
    ///
    /// Returns `false` when no transport exists or it is not open.  The
    /// owned outbound handle is dropped immediately — the manager does not
    /// wait for the close handshake; the final `Disconnect` event and
    /// `DISCONNECTED` status arrive when the read loop ends.
    pub fn disconnect(&self) -> bool {
        let mut state = self.shared.lock();
        if state.status != ConnectionStatus::Connected {
            return false;
        }
        let Some(outbound) = state.outbound.take() else {
            return false;
        };
        state.status = ConnectionStatus::Closing;
        drop(state);

        info!("disconnecting at user request");
        let close = WsMessage::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: USER_CLOSE_REASON.into(),
        }));
        // The writer task drains queued frames before it observes the
        // sender dropping, so the close frame still goes out.
        let _ = outbound.send(close);
        true
    }

    /// Queues a text frame: raw text verbatim, structured payloads as JSON.
    ///
    /// Returns `false` unless the transport is open.
    pub fn send_message(&self, payload: &Payload) -> bool {
        let text = match payload.to_wire_text() {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to serialize outbound payload: {e}");
                return false;
            }
        };
        self.send_frame(WsMessage::Text(text))
    }

    /// Queues a binary frame.  Same guard as [`send_message`].
    ///
    /// [`send_message`]: ConnectionManager::send_message
    pub fn send_binary(&self, data: Vec<u8>) -> bool {
        self.send_frame(WsMessage::Binary(data))
    }

    fn send_frame(&self, frame: WsMessage) -> bool {
        let state = self.shared.lock();
        if state.status != ConnectionStatus::Connected {
            return false;
        }
        match state.outbound.as_ref() {
            Some(outbound) => outbound.send(frame).is_ok(),
            None => false,
        }
    }
}

// ── Connection task ───────────────────────────────────────────────────────────

/// Drives one connection attempt end to end: handshake, writer task, read
/// loop, final status.
async fn run_connection(
    shared: Arc<ManagerShared>,
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    epoch: u64,
) {
    let (ws_stream, _response) = match connect_async(request).await {
        Ok(pair) => pair,
        Err(e) => {
            // The error detail from the handshake is logged but not exposed:
            // listeners get a generic description (the underlying transport
            // error is not assumed reliably available).
            warn!("WebSocket connection failed: {e}");
            if shared.finalize(epoch, ConnectionStatus::NotInitialized) {
                shared.registry.notify(&ConnectionEvent::Error {
                    message: "WebSocket connection failed".to_string(),
                });
            }
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();

    let superseded = {
        let mut state = shared.lock();
        if state.epoch != epoch {
            true
        } else {
            state.status = ConnectionStatus::Connected;
            state.outbound = Some(out_tx);
            false
        }
    };
    if superseded {
        // A newer connect superseded this attempt while the handshake
        // was in flight; close the orphan quietly.
        debug!("connection attempt superseded; closing");
        let _ = ws_tx.close().await;
        return;
    }

    let connection_id = Uuid::new_v4();
    info!("WebSocket connected (id {connection_id})");
    shared
        .registry
        .notify(&ConnectionEvent::Connect { id: connection_id });

    // Writer: forwards queued frames to the sink.  Ends when the sender is
    // dropped (disconnect / teardown) or after a close frame goes out.
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let closing = matches!(frame, WsMessage::Close(_));
            if ws_tx.send(frame).await.is_err() {
                debug!("WebSocket send failed; stopping writer");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Reader: translates inbound frames into events until the stream ends.
    let mut close_reason = DEFAULT_CLOSE_REASON.to_string();
    let mut close_code = ABNORMAL_CLOSE_CODE;

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                // Structured decode first; raw text on failure.  A decode
                // failure is not an error — plain-string frames are part of
                // the protocol.
                let payload = match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(value) => Payload::Json(value),
                    Err(_) => Payload::Text(text),
                };
                shared.registry.notify(&ConnectionEvent::Message { payload });
            }
            Ok(WsMessage::Binary(data)) => {
                // Broadcast first (screen viewers and other out-of-band
                // consumers), then the internal listener event, both with
                // the same bytes.
                let _ = shared.binary_tx.send(data.clone());
                shared
                    .registry
                    .notify(&ConnectionEvent::BinaryMessage { data });
            }
            Ok(WsMessage::Close(frame)) => {
                if let Some(frame) = frame {
                    close_code = frame.code.into();
                    if !frame.reason.is_empty() {
                        close_reason = frame.reason.into_owned();
                    }
                }
                debug!("close frame received: {close_reason} ({close_code})");
                break;
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => {
                // Protocol-level keepalive; tokio-tungstenite replies to
                // pings automatically on the next write.
            }
            Err(e) => {
                warn!("WebSocket error: {e}");
                shared.registry.notify(&ConnectionEvent::Error {
                    message: "WebSocket error occurred".to_string(),
                });
                break;
            }
        }
    }

    writer.abort();

    // Stale tasks must not clobber a replacement connection's status, but
    // the close of *this* transport is still reported to listeners.
    shared.finalize(epoch, ConnectionStatus::Disconnected);
    info!("WebSocket disconnected: {close_reason} ({close_code})");
    shared.registry.notify(&ConnectionEvent::Disconnect {
        reason: close_reason,
        code: close_code,
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
