//! One recorded allow/block decision for a network flow.

use serde::{Deserialize, Serialize};

/// Outcome of the data-path policy check for one flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    #[inline]
    pub fn is_blocked(self) -> bool {
        matches!(self, Decision::Block)
    }
}

/// Transport protocol of the flow. Informational only; never part of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other(u8),
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Other(0)
    }
}

/// A single connection decision made by the data path. Immutable once built.
///
/// `timestamp` is Unix milliseconds as stamped by the producing collaborator;
/// ingestion rejects non-positive values. `app` may be empty when the flow
/// could not be attributed to an application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub address: String,
    pub port: Option<u16>,
    pub app: String,
    pub protocol: Protocol,
    pub decision: Decision,
    pub timestamp: i64,
}

impl ConnectionEvent {
    /// Creates an event with the minimal required fields.
    #[inline]
    pub fn new(address: impl Into<String>, decision: Decision, timestamp: i64) -> Self {
        Self {
            address: address.into(),
            port: None,
            app: String::new(),
            protocol: Protocol::default(),
            decision,
            timestamp,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }
}
