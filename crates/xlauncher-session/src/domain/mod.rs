//! Domain layer: pure types shared by the session and connection code.
//!
//! Nothing in this module performs I/O or depends on an async runtime, which
//! keeps every type here trivially unit-testable.

pub mod log;
pub mod messages;
pub mod status;

pub use log::{Direction, EncodeError, MessageLogEntry, Payload};
pub use messages::WireCommand;
pub use status::ConnectionStatus;
