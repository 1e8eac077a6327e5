//! TLS engine seam
//!
//! The transport only orchestrates a TLS engine; it never does cryptography
//! itself. These traits describe the capabilities it needs. Configuration
//! objects and sessions are owned, move-only values: a configuration is
//! consumed when a session is created from it, and a session is dropped
//! exactly once by whoever owns it.

use super::info::SessionInfo;
use std::fmt;
use std::path::Path;

/// Failure reported by a TLS engine call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<openssl::error::ErrorStack> for EngineError {
    fn from(stack: openssl::error::ErrorStack) -> Self {
        EngineError::new(stack.to_string())
    }
}

/// Classification of a failed record read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    /// No application data is available yet
    WantRead,
    /// The transport cannot accept more data yet
    WantWrite,
    /// The peer sent close-notify
    ZeroReturn,
    /// Underlying socket error or unexpected EOF
    Syscall,
    /// Protocol-level failure inside the engine
    Protocol,
    /// The session is not bound to a connection
    NotConnected,
}

/// Failed record read or write
///
/// `ret` is the engine's own non-positive return value. Callers of the
/// transport receive it unchanged, so it must never be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFailure {
    pub ret: i32,
    pub kind: IoErrorKind,
    pub reason: String,
}

impl IoFailure {
    pub fn new(ret: i32, kind: IoErrorKind, reason: impl Into<String>) -> Self {
        IoFailure {
            ret,
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for IoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (kind={:?}, ret={})", self.reason, self.kind, self.ret)
    }
}

/// Result of sending close-notify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownState {
    /// Our close-notify went out; the peer's has not arrived yet
    Sent,
    /// Close-notify has been exchanged in both directions
    Received,
    /// The engine could not perform the shutdown step
    Failed(String),
}

/// Verdict of peer certificate verification after the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerVerification {
    Ok,
    Failed { code: i32, reason: String },
}

/// Factory for configuration objects and sessions
pub trait TlsEngine {
    /// Connected socket a session is bound to
    type Socket;
    /// Parsed X.509 certificate
    type Certificate;
    /// Per-connection configuration object
    type Config: TlsConfig<Certificate = Self::Certificate>;
    /// Per-connection session
    type Session: TlsSession<Socket = Self::Socket>;

    /// Create a configuration object for client-role connections
    fn new_client_config(&self) -> Result<Self::Config, EngineError>;

    /// Parse exactly one PEM-encoded X.509 certificate
    fn parse_certificate(&self, pem: &[u8]) -> Result<Self::Certificate, EngineError>;

    /// Create a session. The configuration is consumed; the session keeps
    /// whatever it needs from it.
    fn new_session(&self, config: Self::Config) -> Result<Self::Session, EngineError>;
}

/// Configuration object accumulating trust anchors and client identity
pub trait TlsConfig {
    type Certificate;

    /// Transparently retry reads and writes interrupted by non-application records
    fn enable_auto_retry(&mut self);

    /// Add a certificate to the trust store
    fn add_trust_anchor(&mut self, cert: Self::Certificate) -> Result<(), EngineError>;

    /// Load a PEM certificate chain used as the client identity
    fn load_certificate_chain(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Load the PEM private key matching the client certificate
    fn load_private_key(&mut self, path: &Path) -> Result<(), EngineError>;
}

/// A single TLS session
pub trait TlsSession {
    type Socket;

    /// Make the handshake fail unless the peer presents a verifiable certificate
    fn require_peer_verification(&mut self);

    /// Associate the connected socket with this session
    fn bind(&mut self, socket: &Self::Socket) -> Result<(), EngineError>;

    /// Offer ALPN protocols (length-prefixed wire format)
    fn set_alpn_protocols(&mut self, wire: &[u8]) -> Result<(), EngineError>;

    /// Cap outgoing record payloads to `len` bytes
    fn set_max_send_fragment(&mut self, len: u16) -> Result<(), EngineError>;

    /// Size of the buffer used to read one encrypted record
    fn set_read_buffer_len(&mut self, len: usize);

    /// Advertise `host` through SNI
    fn set_server_name(&mut self, host: &str) -> Result<(), EngineError>;

    /// Run the client handshake to completion
    fn handshake(&mut self) -> Result<(), EngineError>;

    /// Certificate verification verdict of the last handshake
    fn verify_result(&self) -> PeerVerification;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoFailure>;

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoFailure>;

    /// Perform one shutdown step
    fn shutdown(&mut self) -> ShutdownState;

    /// Negotiated parameters of the established session
    fn info(&self) -> SessionInfo;
}
