//! Message log entry types.
//!
//! The session keeps an append-only, chronologically ordered log of
//! everything that crossed the connection plus locally synthesized "system"
//! entries narrating the connection lifecycle.  Entries are never mutated
//! after append and only removed wholesale by `clear_messages`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failure to turn a payload into its wire form.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which way a log entry travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the server.
    Incoming,
    /// Sent by the local user.
    Outgoing,
    /// Synthesized locally (lifecycle narration, errors); never transmitted.
    System,
}

/// A text-frame payload: either a raw string or a structured JSON value.
///
/// Inbound text frames are decoded as JSON when possible; on decode failure
/// the raw text is kept verbatim rather than surfacing an error.  Outbound
/// payloads keep their original form in the log — the wire serialization
/// happens at the transport boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Raw text.
    Text(String),
    /// A structured JSON value.
    Json(serde_json::Value),
}

impl Payload {
    /// The exact text to put on the wire for this payload.
    ///
    /// Raw text is sent verbatim; JSON values are serialized compactly.
    /// Serialization of an arbitrary in-memory `Value` cannot realistically
    /// fail, but the error is propagated rather than unwrapped so the caller
    /// can turn it into a `false` send result.
    pub fn to_wire_text(&self) -> Result<String, EncodeError> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Json(value) => Ok(serde_json::to_string(value)?),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// One entry in the session's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    /// Unique per entry; a v4 UUID makes collisions negligible across a
    /// session.
    pub id: Uuid,
    /// The logged payload — the original form, not the wire form.
    pub content: Payload,
    /// Incoming, outgoing, or locally synthesized.
    pub direction: Direction,
    /// Capture time (serialized as ISO-8601).
    pub timestamp: DateTime<Utc>,
}

impl MessageLogEntry {
    /// Creates an entry stamped with a fresh id and the current time.
    pub fn new(content: Payload, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            direction,
            timestamp: Utc::now(),
        }
    }

    /// Builds a locally synthesized entry narrating the connection lifecycle.
    ///
    /// `kind` is `"system"` for lifecycle narration and `"error"` for error
    /// reports; the content mirrors the structured shape the server-facing
    /// protocol uses (`{"type": ..., "data": {"message": ...}}`) so UI
    /// message renderers can treat all entries uniformly.
    pub fn system(kind: &str, message: impl Into<String>) -> Self {
        let content = Payload::Json(serde_json::json!({
            "type": kind,
            "data": { "message": message.into() },
        }));
        Self::new(content, Direction::System)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
