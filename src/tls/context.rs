//! Network context: connection establishment and teardown
//!
//! `NetworkContext` owns the connected socket and, once a handshake has
//! fully succeeded, the TLS session. Connect runs a fixed pipeline:
//!
//! 1. validate the context
//! 2. TCP connect through the socket layer
//! 3. create a client configuration object (auto-retry enabled)
//! 4. install credentials
//! 5. create the session (the configuration object is consumed here)
//! 6. require peer verification and bind the socket
//! 7. apply optional parameters (ALPN, fragment length, SNI)
//! 8. handshake
//! 9. check the peer verification verdict
//!
//! The first failing step ends the attempt. The configuration object and
//! the in-progress session are locals of the pipeline, so every early return
//! drops them; the context only receives a session after step 9.

use super::engine::{PeerVerification, ShutdownState, TlsConfig, TlsEngine, TlsSession};
use super::info::SessionInfo;
use super::install::install_credentials;
use super::openssl_engine::OpenSslEngine;
use super::options::apply_optional_params;
use super::status::{Status, TransportError};
use super::Credentials;
use crate::net::{ServerInfo, SocketLayer, SocketStatus, TcpSockets};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Connection state for one TLS transport
pub struct NetworkContext<E = OpenSslEngine, L = TcpSockets>
where
    E: TlsEngine,
    L: SocketLayer<Socket = E::Socket>,
{
    engine: E,
    sockets: L,
    pub(crate) socket: Option<E::Socket>,
    pub(crate) session: Option<E::Session>,
}

impl NetworkContext {
    /// Context using OpenSSL over `socket2` TCP sockets
    pub fn new() -> Self {
        NetworkContext::with_parts(OpenSslEngine::new(), TcpSockets::new())
    }
}

impl Default for NetworkContext {
    fn default() -> Self {
        NetworkContext::new()
    }
}

impl<E, L> NetworkContext<E, L>
where
    E: TlsEngine,
    L: SocketLayer<Socket = E::Socket>,
{
    /// Context using a specific TLS engine and socket layer
    pub fn with_parts(engine: E, sockets: L) -> Self {
        NetworkContext {
            engine,
            sockets,
            socket: None,
            session: None,
        }
    }

    /// Whether a handshake completed and disconnect has not run since
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Whether both the socket and the TLS session are up
    pub fn is_connected(&self) -> bool {
        self.socket.is_some() && self.session.is_some()
    }

    /// The connected socket, if any
    pub fn socket(&self) -> Option<&E::Socket> {
        self.socket.as_ref()
    }

    /// Negotiated parameters of the current session
    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|session| session.info())
    }

    /// Establish a TCP connection to `server` and negotiate TLS over it.
    ///
    /// Zero timeouts leave socket sends or receives unbounded. On failure
    /// the context holds no session; a socket that was already connected is
    /// kept so `disconnect` can tear it down (a later `connect` also
    /// releases it).
    pub fn connect(
        &mut self,
        server: &ServerInfo,
        credentials: &Credentials,
        send_timeout: Duration,
        recv_timeout: Duration,
    ) -> Result<(), TransportError> {
        let result = self.establish(server, credentials, send_timeout, recv_timeout);

        match &result {
            Ok(()) => debug!(host = server.host(), port = server.port(), "Established a TLS connection."),
            Err(e) => error!(
                host = server.host(),
                port = server.port(),
                status = %e.status(),
                error = %e,
                "Failed to establish a TLS connection."
            ),
        }

        result
    }

    fn establish(
        &mut self,
        server: &ServerInfo,
        credentials: &Credentials,
        send_timeout: Duration,
        recv_timeout: Duration,
    ) -> Result<(), TransportError> {
        if self.session.is_some() {
            error!("Parameter check failed: context already holds an established session.");
            return Err(TransportError::InvalidParameter(
                "context is already connected".to_string(),
            ));
        }
        self.release_stale_socket();

        let socket = self
            .sockets
            .connect(server, send_timeout, recv_timeout)
            .map_err(TransportError::socket)?;
        let socket = self.socket.insert(socket);

        let mut config = self.engine.new_client_config().map_err(|e| {
            error!(error = %e, "Creation of a new TLS configuration object failed.");
            TransportError::Api(e)
        })?;
        config.enable_auto_retry();

        install_credentials(&self.engine, &mut config, credentials).map_err(|e| {
            error!("Setting up credentials failed.");
            TransportError::InvalidCredentials(e)
        })?;

        let mut session = self.engine.new_session(config).map_err(|e| {
            error!(error = %e, "Failed to create a new TLS session.");
            TransportError::Api(e)
        })?;

        session.require_peer_verification();
        session.bind(socket).map_err(|e| {
            error!(error = %e, "Failed to associate the socket with the TLS session.");
            TransportError::Api(e)
        })?;

        apply_optional_params(&mut session, credentials);

        session.handshake().map_err(|e| {
            error!(error = %e, "Failed to perform TLS handshake.");
            TransportError::HandshakeFailed(e.to_string())
        })?;

        if let PeerVerification::Failed { code, reason } = session.verify_result() {
            error!(code, reason = %reason, "Failed to verify X509 certificate from peer.");
            return Err(TransportError::HandshakeFailed(format!(
                "peer certificate verification failed: {} ({})",
                reason, code
            )));
        }

        self.session = Some(session);
        Ok(())
    }

    fn release_stale_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            debug!("Releasing socket left by a previous connect attempt.");
            let status = self.sockets.disconnect(socket);
            if status != SocketStatus::Success {
                warn!(status = ?status, "Releasing stale socket failed.");
            }
        }
    }

    /// Close the TLS session (if any) and tear down the socket.
    ///
    /// Sends close-notify and, if the peer's close-notify has not arrived
    /// yet, tries once more to read it, ignoring the outcome. That second
    /// attempt blocks until the peer answers or closes, bounded only by the
    /// receive timeout given to `connect` (a zero timeout means no bound).
    /// The socket is torn down regardless of how the TLS shutdown went.
    pub fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(mut session) = self.session.take() {
            match session.shutdown() {
                ShutdownState::Sent => {
                    let _ = session.shutdown();
                }
                ShutdownState::Received => {}
                ShutdownState::Failed(reason) => {
                    warn!(reason = %reason, "TLS shutdown failed; tearing down the socket anyway.");
                }
            }
        }

        let status = match self.socket.take() {
            Some(socket) => Status::from(self.sockets.disconnect(socket)),
            None => {
                error!("Parameter check failed: context has no connected socket.");
                Status::InvalidParameter
            }
        };

        if status.is_success() {
            debug!("Disconnected TLS transport.");
            Ok(())
        } else {
            Err(TransportError::Socket(status))
        }
    }
}
