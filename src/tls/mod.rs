//! Client-side TLS transport
//!
//! Connects to a server over TCP, negotiates TLS with server (and optionally
//! client) certificate authentication and then moves application bytes over
//! the encrypted channel.
//!
//! # Architecture
//!
//! The transport is written against three engine traits so the connection
//! state machine does not depend on a particular TLS library:
//!
//! 1. `TlsEngine` creates configuration objects, parses certificates and
//!    turns a configuration into a session
//! 2. `TlsConfig` is the per-connection client configuration (trust store,
//!    client identity)
//! 3. `TlsSession` carries the handshake, encrypted I/O and shutdown
//!
//! `OpenSslEngine` is the production implementation. Sockets come from a
//! `SocketLayer` (`TcpSockets` by default).
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tls_transport::net::ServerInfo;
//! use tls_transport::tls::{Credentials, NetworkContext};
//!
//! let credentials = Credentials::builder()
//!     .root_ca("certs/root-ca.pem")
//!     .client_cert("certs/device.pem")
//!     .private_key("certs/device.key")
//!     .alpn(&["x-amzn-mqtt-ca"])
//!     .sni("broker.example.com")
//!     .build();
//!
//! let mut ctx = NetworkContext::new();
//! ctx.connect(
//!     &ServerInfo::new("broker.example.com", 8883),
//!     &credentials,
//!     Duration::from_secs(5),
//!     Duration::from_millis(500),
//! )
//! .unwrap();
//!
//! ctx.send(b"hello");
//! let mut buf = [0u8; 1024];
//! let n = ctx.recv(&mut buf);
//! ctx.disconnect().unwrap();
//! ```

pub mod cert;
pub mod context;
pub mod credentials;
pub mod engine;
pub mod info;
pub mod install;
pub mod io;
pub mod openssl_engine;
pub mod options;
pub mod status;


pub use cert::CertInfo;
pub use context::NetworkContext;
pub use credentials::{Credentials, CredentialsBuilder};
pub use engine::{
    EngineError, IoErrorKind, IoFailure, PeerVerification, ShutdownState, TlsConfig, TlsEngine,
    TlsSession,
};
pub use info::SessionInfo;
pub use install::CredentialError;
pub use io::{Transport, NO_SESSION};
pub use openssl_engine::{OpenSslConfig, OpenSslEngine, OpenSslSession};
pub use status::{Status, TransportError};
