//! Send and receive over an established session
//!
//! Both calls report a byte count on success and the engine's raw return
//! code on failure, so the sign of the result is the only success signal.
//! A receive that would block yields 0, which callers polling on a socket
//! timeout treat as "nothing yet".

use super::context::NetworkContext;
use super::engine::{IoErrorKind, TlsEngine, TlsSession};
use crate::net::SocketLayer;
use tracing::error;

/// Returned when the context holds no session
pub const NO_SESSION: i32 = -1;

/// Byte-oriented transport interface
pub trait Transport {
    /// Write `buf` to the peer; returns bytes written or a negative code
    fn send(&mut self, buf: &[u8]) -> i32;

    /// Read into `buf`; returns bytes read, 0 when nothing is available,
    /// or the engine's failure code
    fn recv(&mut self, buf: &mut [u8]) -> i32;
}

// Engine reads and writes are bounded by an int-sized length
fn clamp(len: usize) -> usize {
    len.min(i32::MAX as usize)
}

impl<E, L> NetworkContext<E, L>
where
    E: TlsEngine,
    L: SocketLayer<Socket = E::Socket>,
{
    /// Send `buf` through the TLS session
    pub fn send(&mut self, buf: &[u8]) -> i32 {
        let Some(session) = self.session.as_mut() else {
            error!("Cannot send: no TLS session is established on this context.");
            return NO_SESSION;
        };

        let buf = &buf[..clamp(buf.len())];
        match session.write(buf) {
            Ok(n) => n as i32,
            Err(failure) => {
                error!(
                    ret = failure.ret,
                    kind = ?failure.kind,
                    "Failed to send data over network: {}",
                    failure.reason
                );
                failure.ret
            }
        }
    }

    /// Receive up to `buf.len()` bytes from the TLS session
    pub fn recv(&mut self, buf: &mut [u8]) -> i32 {
        let Some(session) = self.session.as_mut() else {
            error!("Cannot receive: no TLS session is established on this context.");
            return NO_SESSION;
        };

        let len = clamp(buf.len());
        match session.read(&mut buf[..len]) {
            Ok(n) => n as i32,
            Err(failure) if failure.kind == IoErrorKind::WantRead => 0,
            Err(failure) => {
                error!(
                    ret = failure.ret,
                    kind = ?failure.kind,
                    "Failed to receive data over network: {}",
                    failure.reason
                );
                failure.ret
            }
        }
    }
}

impl<E, L> Transport for NetworkContext<E, L>
where
    E: TlsEngine,
    L: SocketLayer<Socket = E::Socket>,
{
    fn send(&mut self, buf: &[u8]) -> i32 {
        NetworkContext::send(self, buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> i32 {
        NetworkContext::recv(self, buf)
    }
}
