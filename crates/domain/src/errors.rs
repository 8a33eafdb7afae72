//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for AuthDesk
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthDeskError {
    /// The redirect catcher could not bind its configured address.
    #[error("Port bind error: {0}")]
    PortBind(String),

    /// A redirect carried a `state` that does not belong to the active session.
    #[error("State mismatch: redirect state does not match the active session")]
    StateMismatch,

    /// The token endpoint could not be reached.
    #[error("Token exchange transport error: {0}")]
    TokenExchangeTransport(String),

    /// The token endpoint answered with an OAuth error or an unusable body.
    #[error("Token exchange protocol error: {error}{}", .description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    TokenExchangeProtocol { error: String, description: Option<String> },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The authentication surface failed to open, navigate or close.
    #[error("Authentication surface error: {0}")]
    Surface(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    /// Another authentication attempt is already exchanging tokens.
    #[error("Authentication attempt already in progress ({0})")]
    AttemptInProgress(String),

    /// The identity provider redirected back with an `error` instead of a code.
    #[error("Authorization denied: {0}")]
    Authorization(String),

    /// The user closed the authentication surface before the redirect.
    #[error("Authentication cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthDeskError {
    /// Stable label for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::PortBind(_) => "port_bind",
            Self::StateMismatch => "state_mismatch",
            Self::TokenExchangeTransport(_) => "token_exchange_transport",
            Self::TokenExchangeProtocol { .. } => "token_exchange_protocol",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
            Self::Surface(_) => "surface",
            Self::Ipc(_) => "ipc",
            Self::AttemptInProgress(_) => "attempt_in_progress",
            Self::Authorization(_) => "authorization",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for AuthDesk operations
pub type Result<T> = std::result::Result<T, AuthDeskError>;
