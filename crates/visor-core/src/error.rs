//! Error types for the Visor client core.

use thiserror::Error;

/// A shared error type for the entire Visor client core.
///
/// The taxonomy mirrors the three failure classes of the remote service
/// boundary, plus local precondition errors raised before any network
/// traffic is issued:
///
/// - `Transport`: the request could not complete (connection, timeout, body
///   read failures).
/// - `Service`: the service answered with a well-formed error envelope or a
///   non-2xx status.
/// - `Contract`: a success envelope was missing or malformed in a field the
///   client depends on. Handled exactly like `Service` by callers: fail
///   closed, commit nothing.
#[derive(Error, Debug, Clone)]
pub enum VisorError {
    /// The request could not complete.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The service returned an error envelope or a non-2xx status.
    #[error("service error: {message}")]
    Service { message: String },

    /// A success envelope was missing an expected field.
    #[error("contract violation in {operation} response: {message}")]
    Contract {
        operation: &'static str,
        message: String,
    },

    /// Entity not found in local state.
    #[error("{entity_type} not found: '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A resend targeted a slot that is not a replayable bot message.
    #[error("invalid resend target at index {index}: {reason}")]
    InvalidResendTarget { index: usize, reason: &'static str },

    /// An operation was invoked outside the workflow stage that permits it.
    #[error("operation requires the {expected} stage, current stage is {actual}")]
    WrongStage {
        expected: &'static str,
        actual: &'static str,
    },

    /// No session is bound to the conversation stage.
    #[error("no active session")]
    NoActiveSession,
}

impl VisorError {
    /// Creates a Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a Service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Creates a Contract error for the named operation.
    pub fn contract(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Contract {
            operation,
            message: message.into(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Check if this is a Transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a Service error.
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    /// Check if this is a Contract error.
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }

    /// Check if this error came back from the remote boundary.
    ///
    /// Contract violations count: a malformed success envelope is a remote
    /// failure as far as rollback policy is concerned.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Service { .. } | Self::Contract { .. }
        )
    }
}

impl From<reqwest::Error> for VisorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VisorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Service {
            message: format!("malformed response body: {}", err),
        }
    }
}

/// A type alias for `Result<T, VisorError>`.
pub type Result<T> = std::result::Result<T, VisorError>;
