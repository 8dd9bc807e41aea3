//! Session façade: the only interface application views use.
//!
//! A [`Session`] wraps one [`ConnectionManager`] and adds what view code
//! needs on top of the raw connection: guarded commands (no double-connect,
//! no send-while-disconnected), an append-only message log with locally
//! synthesized "system" entries narrating the connection lifecycle, and the
//! last error string.
//!
//! Status is *not* mirrored here.  The manager's single authoritative value
//! is read directly through [`Session::status`], so the status can never be
//! stale and no reconciliation pass is needed.
//!
//! # Side-effect discipline
//!
//! Every command and every passive transition appends at most one log
//! entry; entries are never mutated after append and only removed wholesale
//! by [`Session::clear_messages`].

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use crate::domain::log::{Direction, MessageLogEntry, Payload};
use crate::domain::messages::WireCommand;
use crate::domain::status::ConnectionStatus;
use crate::infrastructure::connection::ConnectionManager;
use crate::infrastructure::events::{ConnectionEvent, EventKind, Subscription};

/// Error string recorded when a send is attempted without an open transport.
const SEND_NOT_CONNECTED: &str = "Failed to send message: Not connected";

/// Session configuration.
///
/// The default server URL comes from the deployment environment (the
/// console binary reads `XLAUNCHER_WS_URL`); the session passes it to the
/// transport opaquely, without validation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// URL used by [`Session::connect`] when the caller passes `None`.
    pub default_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_url: "ws://127.0.0.1:8765".to_string(),
        }
    }
}

struct SessionInner {
    manager: Arc<ConnectionManager>,
    config: SessionConfig,
    log: Mutex<Vec<MessageLogEntry>>,
    error: Mutex<Option<String>>,
    /// Listener registrations; dropped (and thereby unsubscribed) together
    /// with the last session handle.
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SessionInner {
    fn push(&self, entry: MessageLogEntry) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn push_system(&self, kind: &str, message: impl Into<String>) {
        self.push(MessageLogEntry::system(kind, message));
    }

    fn set_error(&self, message: impl Into<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    fn clear_error(&self) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Records a send failure: error string plus one system error entry.
    /// The unsent payload never reaches the log.
    fn record_send_failure(&self) {
        self.set_error(SEND_NOT_CONNECTED);
        self.push_system("error", SEND_NOT_CONNECTED);
    }
}

/// The consumer-facing session handle.
///
/// Cheap to clone; all clones observe the same log, error, and connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Builds a session on top of `manager` and wires up the passive
    /// transitions (connect/disconnect/error/message listeners).
    pub fn new(manager: Arc<ConnectionManager>, config: SessionConfig) -> Self {
        let inner = Arc::new(SessionInner {
            manager,
            config,
            log: Mutex::new(Vec::new()),
            error: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        });

        // Listeners hold only a weak reference so the registry never keeps
        // a dropped session alive.
        let weak = Arc::downgrade(&inner);
        let subscriptions = vec![
            Self::listen(&inner, EventKind::Connect, weak.clone()),
            Self::listen(&inner, EventKind::Disconnect, weak.clone()),
            Self::listen(&inner, EventKind::Error, weak.clone()),
            Self::listen(&inner, EventKind::Message, weak),
        ];
        *inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;

        Self { inner }
    }

    fn listen(
        inner: &Arc<SessionInner>,
        kind: EventKind,
        weak: Weak<SessionInner>,
    ) -> Subscription {
        inner.manager.add_listener(kind, move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            Self::on_event(&inner, event);
        })
    }

    /// Passive transitions driven by the connection manager's events.
    fn on_event(inner: &SessionInner, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Connect { id } => {
                // A successful (re)connection clears any stale error.
                inner.clear_error();
                inner.push_system("system", format!("Connected with ID: {id}"));
            }
            ConnectionEvent::Disconnect { reason, code } => {
                inner.push_system("system", format!("Disconnected: {reason} (code {code})"));
            }
            ConnectionEvent::Error { message } => {
                // Recorded but status is untouched: a mid-session error does
                // not imply disconnection.
                inner.set_error(message.clone());
                inner.push_system("error", message.clone());
            }
            ConnectionEvent::Message { payload } => {
                inner.push(MessageLogEntry::new(payload.clone(), Direction::Incoming));
            }
            ConnectionEvent::BinaryMessage { .. } => {
                // Blobs stay out of the log; screen viewers consume them via
                // the manager's binary broadcast.
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Connects to `url`, or to the configured default when `None`.
    ///
    /// Rejected with a system entry while a transport is already open or
    /// opening.  On a delegation failure (the manager could not even start
    /// the attempt) the error is recorded and one system error entry
    /// appended; an asynchronous connection failure arrives later as an
    /// `Error` event.
    pub fn connect(&self, url: Option<&str>) -> bool {
        if self.status().is_active() {
            debug!("connect rejected: already connected or connecting");
            self.inner.push_system("system", "Already connected or connecting");
            return false;
        }
        let url = url.unwrap_or(&self.inner.config.default_url);
        if self.inner.manager.connect(url) {
            true
        } else {
            let message = format!("Failed to open WebSocket connection to {url}");
            self.inner.set_error(message.clone());
            self.inner.push_system("error", message);
            false
        }
    }

    /// Disconnects the open transport.
    ///
    /// Rejected unless the status is `CONNECTED` or `CONNECTING`.  The
    /// single system entry reporting the disconnection is appended by the
    /// passive `Disconnect` transition once the transport winds down.  While
    /// still `CONNECTING` the attempt cannot be cancelled mid-flight; the
    /// delegation reports `false` and the caller retries once connected.
    pub fn disconnect(&self) -> bool {
        if !self.status().is_active() {
            return false;
        }
        self.inner.manager.disconnect()
    }

    /// Sends a text or structured payload.
    ///
    /// Succeeds only while the status is exactly `CONNECTED`; on success the
    /// log gains one `outgoing` entry holding the *original* payload, not
    /// its wire serialization.
    pub fn send_message(&self, payload: impl Into<Payload>) -> bool {
        let payload = payload.into();
        if self.status() != ConnectionStatus::Connected {
            self.inner.record_send_failure();
            return false;
        }
        if self.inner.manager.send_message(&payload) {
            self.inner
                .push(MessageLogEntry::new(payload, Direction::Outgoing));
            true
        } else {
            self.inner.record_send_failure();
            false
        }
    }

    /// Sends a typed wire command (logged in its structured form).
    pub fn send_command(&self, command: WireCommand) -> bool {
        self.send_message(Payload::from(command))
    }

    /// Sends an opaque binary frame.  Binary payloads are not logged.
    pub fn send_binary(&self, data: Vec<u8>) -> bool {
        if self.status() != ConnectionStatus::Connected {
            self.inner.record_send_failure();
            return false;
        }
        if self.inner.manager.send_binary(data) {
            true
        } else {
            self.inner.record_send_failure();
            false
        }
    }

    /// Empties the message log.  Status and error are untouched.
    pub fn clear_messages(&self) {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// The manager's authoritative connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.manager.status()
    }

    /// A snapshot of the message log, in chronological order.
    pub fn messages(&self) -> Vec<MessageLogEntry> {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The last recorded error, or `None` after a successful (re)connection.
    pub fn error(&self) -> Option<String> {
        self.inner
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The underlying connection manager (for binary-frame subscriptions and
    /// custom listeners).
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.inner.manager
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::connection::ManagerConfig;

    fn make_session() -> Session {
        let manager = Arc::new(ConnectionManager::new(ManagerConfig::default()));
        Session::new(manager, SessionConfig::default())
    }

    fn last_system_message(session: &Session) -> String {
        let messages = session.messages();
        let entry = messages.last().expect("log must not be empty");
        assert_eq!(entry.direction, Direction::System);
        match &entry.content {
            Payload::Json(value) => value["data"]["message"]
                .as_str()
                .expect("system entry carries a message")
                .to_string(),
            other => panic!("system entry must be structured, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_empty() {
        let session = make_session();
        assert_eq!(session.status(), ConnectionStatus::NotInitialized);
        assert!(session.messages().is_empty());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_before_connect_returns_false_and_log_unchanged() {
        let session = make_session();
        assert!(!session.disconnect());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_while_disconnected_records_error_entry() {
        let session = make_session();

        assert!(!session.send_message(serde_json::json!({"type": "list_apps"})));

        assert_eq!(session.error().as_deref(), Some(SEND_NOT_CONNECTED));
        let messages = session.messages();
        assert_eq!(messages.len(), 1, "one system error entry, no outgoing entry");
        assert_eq!(messages[0].direction, Direction::System);
        assert!(!messages.iter().any(|m| m.direction == Direction::Outgoing));
    }

    #[tokio::test]
    async fn test_send_binary_while_disconnected_returns_false() {
        let session = make_session();
        assert!(!session.send_binary(vec![0xFF; 16]));
        assert_eq!(session.error().as_deref(), Some(SEND_NOT_CONNECTED));
    }

    #[tokio::test]
    async fn test_connect_rejected_while_connecting() {
        let session = make_session();
        // The handshake to the discard port hangs; the manager stays in
        // CONNECTING because this test never yields to the connect task.
        assert!(session.connect(Some("ws://127.0.0.1:9")));
        assert_eq!(session.status(), ConnectionStatus::Connecting);

        assert!(!session.connect(Some("ws://127.0.0.1:9")));
        assert_eq!(last_system_message(&session), "Already connected or connecting");
    }

    #[tokio::test]
    async fn test_connect_delegation_failure_records_error() {
        let session = make_session();

        assert!(!session.connect(Some("not a url")));

        let error = session.error().expect("error must be recorded");
        assert!(error.starts_with("Failed to open WebSocket connection"));
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_uses_default_url_when_none_given() {
        let manager = Arc::new(ConnectionManager::new(ManagerConfig::default()));
        let session = Session::new(
            manager,
            SessionConfig {
                default_url: "definitely not a url".to_string(),
            },
        );
        // The invalid default makes the delegation fail, proving it was used.
        assert!(!session.connect(None));
        assert!(session
            .error()
            .expect("error recorded")
            .contains("definitely not a url"));
    }

    #[tokio::test]
    async fn test_clear_messages_empties_log_only() {
        let session = make_session();
        let _ = session.send_message("hello"); // guard failure appends one entry
        assert!(!session.messages().is_empty());
        assert!(session.error().is_some());

        session.clear_messages();

        assert!(session.messages().is_empty());
        assert!(session.error().is_some(), "clear_messages must not touch error");
        assert_eq!(session.status(), ConnectionStatus::NotInitialized);
    }

    #[tokio::test]
    async fn test_clones_share_the_same_log() {
        let session = make_session();
        let clone = session.clone();
        let _ = session.send_message("x");
        assert_eq!(clone.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_passive_connect_event_clears_error_and_logs_id() {
        let session = make_session();
        let _ = session.send_message("x"); // record an error first
        assert!(session.error().is_some());

        let id = uuid::Uuid::new_v4();
        // Drive the passive transition directly through the session's inner
        // handler, as the manager's notify would.
        Session::on_event(&session.inner, &ConnectionEvent::Connect { id });

        assert!(session.error().is_none(), "connect clears the error");
        assert!(last_system_message(&session).contains(&id.to_string()));
    }

    #[tokio::test]
    async fn test_passive_disconnect_event_logs_reason_and_code() {
        let session = make_session();
        Session::on_event(
            &session.inner,
            &ConnectionEvent::Disconnect {
                reason: "Disconnect requested by user".into(),
                code: 1000,
            },
        );
        let message = last_system_message(&session);
        assert!(message.contains("Disconnect requested by user"));
        assert!(message.contains("1000"));
    }

    #[tokio::test]
    async fn test_passive_error_event_records_error_without_status_change() {
        let session = make_session();
        Session::on_event(
            &session.inner,
            &ConnectionEvent::Error {
                message: "WebSocket error occurred".into(),
            },
        );
        assert_eq!(session.error().as_deref(), Some("WebSocket error occurred"));
        assert_eq!(session.status(), ConnectionStatus::NotInitialized);
    }

    #[tokio::test]
    async fn test_passive_message_event_appends_incoming_entry() {
        let session = make_session();
        Session::on_event(
            &session.inner,
            &ConnectionEvent::Message {
                payload: Payload::Text("plain text".into()),
            },
        );
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].direction, Direction::Incoming);
        assert_eq!(messages[0].content, Payload::Text("plain text".into()));
    }

    #[tokio::test]
    async fn test_passive_binary_event_does_not_touch_the_log() {
        let session = make_session();
        Session::on_event(
            &session.inner,
            &ConnectionEvent::BinaryMessage { data: vec![1, 2, 3] },
        );
        assert!(session.messages().is_empty());
    }
}
