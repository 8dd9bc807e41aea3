//! Application layer: the session façade view code talks to.

pub mod session;

pub use session::{Session, SessionConfig};
