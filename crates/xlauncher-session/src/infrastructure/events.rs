//! Event vocabulary and listener fan-out.
//!
//! The connection manager translates raw socket activity into a small set of
//! [`ConnectionEvent`]s and delivers them to registered callbacks through a
//! [`ListenerRegistry`].  Listeners for one event kind fire in registration
//! order; unregistration happens through the [`Subscription`] handle returned
//! at registration time and is idempotent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use uuid::Uuid;

use crate::domain::log::Payload;

// ── Event vocabulary ──────────────────────────────────────────────────────────

/// The kinds of events the connection manager emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The transport opened.
    Connect,
    /// The transport closed (remote close, local close, or failure).
    Disconnect,
    /// A transport-level error occurred.  Does not imply disconnection.
    Error,
    /// A text frame arrived.
    Message,
    /// A binary frame arrived.
    BinaryMessage,
}

/// One event from the connection manager.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The transport opened; `id` is a freshly generated opaque connection id.
    Connect { id: Uuid },
    /// The transport closed.
    Disconnect {
        /// Close reason from the close frame, or a generic fallback.
        reason: String,
        /// Numeric WebSocket close code (1000 = normal, 1006 = abnormal).
        code: u16,
    },
    /// A transport error.  The description is deliberately generic — the
    /// underlying error detail is not assumed reliably available.
    Error { message: String },
    /// A decoded text frame: structured JSON when it parsed, raw text when
    /// it did not.
    Message { payload: Payload },
    /// An opaque binary frame (e.g., a streamed screen capture).
    BinaryMessage { data: Vec<u8> },
}

impl ConnectionEvent {
    /// The [`EventKind`] this event is dispatched under.
    pub fn kind(&self) -> EventKind {
        match self {
            ConnectionEvent::Connect { .. } => EventKind::Connect,
            ConnectionEvent::Disconnect { .. } => EventKind::Disconnect,
            ConnectionEvent::Error { .. } => EventKind::Error,
            ConnectionEvent::Message { .. } => EventKind::Message,
            ConnectionEvent::BinaryMessage { .. } => EventKind::BinaryMessage,
        }
    }
}

// ── Listener registry ─────────────────────────────────────────────────────────

type Callback = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    /// Event kind → callbacks in registration order.
    listeners: HashMap<EventKind, Vec<(u64, Callback)>>,
}

/// Maps each event kind to an ordered callback list.
///
/// The registry is exclusively owned by the connection manager; consumers
/// interact with it only through [`ListenerRegistry::subscribe`] and the
/// returned [`Subscription`] handles.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<RegistryInner>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind` and returns the unsubscribe handle.
    ///
    /// Callbacks run synchronously on the task that emits the event, in
    /// registration order, so they must not block.
    pub fn subscribe(
        registry: &Arc<Self>,
        kind: EventKind,
        callback: impl Fn(&ConnectionEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = {
            let mut inner = registry.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner
                .listeners
                .entry(kind)
                .or_default()
                .push((id, Arc::new(callback)));
            id
        };
        Subscription {
            registry: Arc::downgrade(registry),
            kind,
            id,
        }
    }

    /// Invokes every callback registered for the event's kind, in
    /// registration order.
    pub fn notify(&self, event: &ConnectionEvent) {
        // Clone the callback list out of the lock so a callback that
        // registers or unregisters listeners cannot deadlock the registry.
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner
                .listeners
                .get(&event.kind())
                .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(event);
        }
    }

    /// Removes a listener by id.  Removing an absent id is a no-op.
    fn remove(&self, kind: EventKind, id: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(entries) = inner.listeners.get_mut(&kind) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    #[cfg(test)]
    fn listener_count(&self, kind: EventKind) -> usize {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.listeners.get(&kind).map_or(0, Vec::len)
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
///
/// Dropping the handle unsubscribes the callback; calling
/// [`unsubscribe`](Subscription::unsubscribe) explicitly does the same and
/// may be repeated harmlessly.
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// Removes the registered callback.  Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.kind, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
