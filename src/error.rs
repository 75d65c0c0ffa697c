use std::time::Duration;

use crate::rate_limit::RateLimitClass;
use crate::state::ConnectionState;

/// Every failure the gateway client can report, either as a direct return
/// value or through a [`GatewayEvent::Error`](crate::gateway::GatewayEvent).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("authentication failed ({code}): {message}")]
    Authentication { code: u16, message: String },
    #[error("rate limited on {class}, retry after {}ms", .retry_after.as_millis())]
    RateLimited {
        class: RateLimitClass,
        retry_after: Duration,
    },
    #[error("session error: {0}")]
    Session(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("not allowed while {state}")]
    InvalidState { state: ConnectionState },
    #[error("max reconnect attempts reached ({attempts})")]
    ReconnectsExhausted { attempts: u32 },
    #[error("gateway client has shut down")]
    Closed,
}

impl GatewayError {
    /// Stable machine-readable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "configuration_error",
            GatewayError::Connection(_) => "connection_error",
            GatewayError::Protocol(_) => "protocol_error",
            GatewayError::Authentication { .. } => "authentication_error",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Session(_) => "session_error",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::InvalidState { .. } => "invalid_state",
            GatewayError::ReconnectsExhausted { .. } => "reconnects_exhausted",
            GatewayError::Closed => "closed",
        }
    }

    /// Whether the client stops on its own after this error and needs an
    /// explicit `connect()` to go again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::Configuration(_)
                | GatewayError::Authentication { .. }
                | GatewayError::ReconnectsExhausted { .. }
                | GatewayError::Closed
        )
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Protocol(e.to_string())
    }
}
