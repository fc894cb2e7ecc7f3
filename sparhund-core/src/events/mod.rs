//! Connection-decision event types.

mod connection;

pub use connection::{ConnectionEvent, Decision, Protocol};
