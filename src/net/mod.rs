//! Socket layer
//!
//! Plain TCP connection setup and teardown underneath the TLS transport.
//! Every operation reports a `SocketStatus`; the TLS layer translates those
//! codes into its own `Status` vocabulary.
//!
//! The `SocketLayer` trait is the seam the transport is written against, so
//! an embedded platform can provide its own socket wrapper. `TcpSockets` is
//! the default implementation on top of `socket2`.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Result codes reported by a socket layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    /// Operation completed
    Success,
    /// Missing host, zero port, or an unusable socket
    InvalidParameter,
    /// Host name could not be resolved
    DnsFailure,
    /// No resolved address accepted the connection
    ConnectFailure,
    /// A code outside the known set (foreign socket wrappers may report these)
    Other(i32),
}

/// Target server descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    host: String,
    port: u16,
}

impl ServerInfo {
    /// Create a server descriptor from a host name (or address literal) and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ServerInfo {
            host: host.into(),
            port,
        }
    }

    /// Host name or address literal
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Socket operations used by the TLS transport
pub trait SocketLayer {
    /// Connected socket handle
    type Socket;

    /// Resolve `server` and open a TCP connection to it.
    ///
    /// A zero timeout leaves the corresponding socket operation unbounded.
    fn connect(
        &self,
        server: &ServerInfo,
        send_timeout: Duration,
        recv_timeout: Duration,
    ) -> Result<Self::Socket, SocketStatus>;

    /// Shut down and release a connected socket
    fn disconnect(&self, socket: Self::Socket) -> SocketStatus;
}

/// `socket2`-backed socket layer producing blocking `TcpStream`s
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpSockets;

impl TcpSockets {
    /// Create the default socket layer
    pub fn new() -> Self {
        TcpSockets
    }

    fn resolve(server: &ServerInfo) -> Result<Vec<SocketAddr>, SocketStatus> {
        if server.host.is_empty() || server.port == 0 {
            error!(
                host = %server.host,
                port = server.port,
                "Parameter check failed: host must be non-empty and port non-zero."
            );
            return Err(SocketStatus::InvalidParameter);
        }

        let addrs: Vec<SocketAddr> = match (server.host.as_str(), server.port).to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                error!(host = %server.host, error = %e, "DNS resolution failed.");
                return Err(SocketStatus::DnsFailure);
            }
        };

        if addrs.is_empty() {
            error!(host = %server.host, "DNS resolution returned no addresses.");
            return Err(SocketStatus::DnsFailure);
        }

        Ok(addrs)
    }

    fn connect_addr(
        addr: SocketAddr,
        send_timeout: Duration,
        recv_timeout: Duration,
    ) -> io::Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.connect(&addr.into())?;
        socket.set_write_timeout(non_zero(send_timeout))?;
        socket.set_read_timeout(non_zero(recv_timeout))?;
        Ok(socket.into())
    }
}

impl SocketLayer for TcpSockets {
    type Socket = TcpStream;

    fn connect(
        &self,
        server: &ServerInfo,
        send_timeout: Duration,
        recv_timeout: Duration,
    ) -> Result<TcpStream, SocketStatus> {
        let addrs = Self::resolve(server)?;

        for addr in addrs {
            match Self::connect_addr(addr, send_timeout, recv_timeout) {
                Ok(stream) => {
                    debug!(%addr, "Established TCP connection.");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "TCP connect attempt failed.");
                }
            }
        }

        error!(
            host = %server.host,
            port = server.port,
            "Failed to connect to any resolved address."
        );
        Err(SocketStatus::ConnectFailure)
    }

    fn disconnect(&self, socket: TcpStream) -> SocketStatus {
        match socket.shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Peer already closed its side
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                debug!("Socket was already disconnected by the peer.");
            }
            Err(e) => {
                warn!(error = %e, "Socket shutdown failed; closing anyway.");
            }
        }
        SocketStatus::Success
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    }
}
