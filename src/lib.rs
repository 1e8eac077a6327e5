//! TLS transport for constrained clients
//!
//! This crate connects a client to a TLS server over TCP, installs the trust
//! anchor and optional client identity, applies ALPN, maximum fragment length
//! and SNI, and exposes simple `send`/`recv` calls over the resulting session.
//!
//! - `net` resolves hosts and manages plain TCP sockets
//! - `tls` builds the TLS session on top and owns the connection lifecycle

pub mod net;
pub mod tls;
