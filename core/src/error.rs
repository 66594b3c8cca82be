//! Structured error types for typelens
//!
//! Separates faults raised by the submitted script from faults in the
//! local inspector plumbing, so callers can decide how to present each.

use thiserror::Error;

use crate::inspector::TransportError;

/// Primary error type for typelens operations
#[derive(Error, Debug)]
pub enum TypelensError {
    // =========================================================================
    // Inspector Errors
    // =========================================================================
    /// A protocol command failed remotely, or the submitted script threw
    /// or failed to compile. The message is the remote description verbatim.
    #[error("{message}")]
    Protocol { message: String },

    /// Local connection or disconnection fault
    #[error("inspector transport failed: {message}")]
    Transport { message: String },

    /// The host runtime could not be started or its endpoint discovered
    #[error("failed to launch runtime: {message}")]
    Launch { message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    // =========================================================================
    // External Error Wrappers
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

impl TypelensError {
    /// Build a protocol error from a remote description
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether the fault lies in the submitted script rather than the
    /// local plumbing (remote errors count as script faults as well,
    /// since the inspector rejects commands the script state made invalid)
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Protocol { message } => message.clone(),
            Self::Launch { .. } => {
                format!("{}. Is Node.js installed and on PATH?", self)
            }
            _ => self.to_string(),
        }
    }
}

impl From<TransportError> for TypelensError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TypelensError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias using TypelensError
pub type Result<T> = std::result::Result<T, TypelensError>;
