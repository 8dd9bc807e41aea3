//! Infrastructure layer: the WebSocket connection manager and its event
//! fan-out.  This is the only part of the crate that touches the network.

pub mod connection;
pub mod events;

pub use connection::{ConnectionManager, ManagerConfig};
pub use events::{ConnectionEvent, EventKind, ListenerRegistry, Subscription};
