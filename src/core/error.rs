//! Failure taxonomy shared by the credential manager and the dispatch
//! pipeline.
//!
//! Nothing here is allowed to escape `login()` or `send()` as a fault:
//! authentication failures become an [`AuthState::Failed`] transition and
//! dispatch failures become a synthetic assistant message in the log.
//!
//! [`AuthState::Failed`]: crate::auth::AuthState::Failed

use crate::auth::AuthState;
use thiserror::Error;

/// Failures raised by a [`Transport`](crate::core::transport::Transport)
/// before they are mapped onto the caller-facing taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("status {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The backend answered 2xx but the body was not the expected envelope.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Failures reported by the credential lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The master secret was rejected by the backend probe.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated, but no API secret could be obtained.
    #[error("API key could not be issued: {0}")]
    Issuance(String),

    /// The operation needs an authenticated session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// `login()` or `restore()` called from a state that does not allow it.
    #[error("Operation not permitted while {0}")]
    InvalidState(AuthState),
}

/// Failures of a single `send()`; each one is rendered into the
/// conversation as a synthetic assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No usable API secret was available.
    #[error("No API key available: {0}")]
    Credential(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx status or malformed response envelope.
    #[error("API error: {0}")]
    Protocol(String),

    /// The conversation was torn down while the request was outstanding.
    #[error("Request cancelled")]
    Cancelled,
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(cause) => DispatchError::Network(cause),
            TransportError::Status { status, detail } => {
                DispatchError::Protocol(format!("{status} {detail}"))
            }
            TransportError::Malformed(cause) => DispatchError::Protocol(cause),
        }
    }
}

impl From<AuthError> for DispatchError {
    fn from(err: AuthError) -> Self {
        DispatchError::Credential(err.to_string())
    }
}

/// Returned by `clear()` while a request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Conversation is busy sending a message")]
pub struct PipelineBusy;
