//! Inspector session abstraction
//!
//! The session is the boundary between the driver and a running script
//! context. It abstracts how CDP commands reach the runtime:
//! - WebSocketSession: a live inspector endpoint (node --inspect)
//! - scripted fakes in tests

pub mod launcher;
pub mod protocol;
pub mod websocket;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

pub use launcher::{LaunchedRuntime, NodeRuntime};
pub use protocol::{CommandReply, RemoteError};
pub use websocket::WebSocketSession;

/// A single debugger-protocol connection
///
/// Implementations own their event listeners; subscriptions never outlive
/// the session instance they were registered on.
#[async_trait]
pub trait InspectorSession: Send {
    /// Establish the connection
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Tear down the connection
    ///
    /// Must be safe to call on a session that never connected or has
    /// already been disconnected.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Send a command and wait for its reply
    ///
    /// A remote error is not a transport failure: it comes back inside the
    /// reply so the caller can surface the remote description.
    async fn post(&mut self, method: &str, params: Value) -> Result<CommandReply, TransportError>;

    /// Register a listener for a notification method
    ///
    /// Notifications are delivered in arrival order for as long as the
    /// receiver is alive.
    fn subscribe(&mut self, method: &str) -> mpsc::UnboundedReceiver<Value>;
}

/// Errors raised by the local connection, never by the script
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Could not open the connection
    ConnectFailed { url: String, reason: String },

    /// Command issued on a session that is not connected
    NotConnected,

    /// Connection lost while commands were in flight
    Disconnected { reason: String },

    /// Outgoing frame could not be sent
    SendFailed { method: String, error: String },

    /// Serialization error
    Serialization { error: String },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::ConnectFailed { url, reason } => {
                write!(f, "Failed to connect to {}: {}", url, reason)
            }
            TransportError::NotConnected => write!(f, "Session is not connected"),
            TransportError::Disconnected { reason } => write!(f, "Session disconnected: {}", reason),
            TransportError::SendFailed { method, error } => {
                write!(f, "Failed to send {}: {}", method, error)
            }
            TransportError::Serialization { error } => write!(f, "Serialization error: {}", error),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Serialization { error: e.to_string() }
    }
}
