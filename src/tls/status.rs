//! Transport status vocabulary
//!
//! `Status` is the closed set of outcomes reported to callers. Richer
//! failures travel as `TransportError` and collapse to exactly one `Status`.

use super::engine::EngineError;
use super::install::CredentialError;
use crate::net::SocketStatus;
use std::fmt;
use tracing::error;

/// Outcome of a transport operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    InvalidParameter,
    DnsFailure,
    ConnectFailure,
    ApiError,
    HandshakeFailed,
    InvalidCredentials,
}

impl Status {
    /// Get status name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "Success",
            Status::InvalidParameter => "InvalidParameter",
            Status::DnsFailure => "DnsFailure",
            Status::ConnectFailure => "ConnectFailure",
            Status::ApiError => "ApiError",
            Status::HandshakeFailed => "HandshakeFailed",
            Status::InvalidCredentials => "InvalidCredentials",
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Socket layer codes map one to one; anything unrecognized becomes
/// `InvalidParameter`.
impl From<SocketStatus> for Status {
    fn from(status: SocketStatus) -> Self {
        match status {
            SocketStatus::Success => Status::Success,
            SocketStatus::InvalidParameter => Status::InvalidParameter,
            SocketStatus::DnsFailure => Status::DnsFailure,
            SocketStatus::ConnectFailure => Status::ConnectFailure,
            SocketStatus::Other(code) => {
                error!(
                    socket_status = code,
                    "Unexpected status received from socket layer."
                );
                Status::InvalidParameter
            }
        }
    }
}

impl<T> From<&Result<T, TransportError>> for Status {
    fn from(result: &Result<T, TransportError>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Socket layer reported {0}")]
    Socket(Status),

    #[error("TLS engine call failed: {0}")]
    Api(#[from] EngineError),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] CredentialError),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),
}

impl TransportError {
    /// The single status this error reports to callers
    pub fn status(&self) -> Status {
        match self {
            TransportError::InvalidParameter(_) => Status::InvalidParameter,
            TransportError::Socket(status) => *status,
            TransportError::Api(_) => Status::ApiError,
            TransportError::InvalidCredentials(_) => Status::InvalidCredentials,
            TransportError::HandshakeFailed(_) => Status::HandshakeFailed,
        }
    }

    /// Error for a non-success socket layer code
    pub(crate) fn socket(status: SocketStatus) -> Self {
        match Status::from(status) {
            // A layer that fails without a failure code broke its contract
            Status::Success => TransportError::Socket(Status::ConnectFailure),
            status => TransportError::Socket(status),
        }
    }
}
