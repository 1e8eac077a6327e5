//! Optional handshake parameters
//!
//! Applied to a session after it is bound to a socket and before the
//! handshake. Every setting is best-effort: failures are logged and the
//! engine's default stays in effect.

use super::credentials::{encode_alpn, Credentials};
use super::engine::TlsSession;
use tracing::{debug, error};

/// Largest record-layer expansion of an encrypted record over its plaintext
/// (256 bytes of padding and header plus a 64 byte MAC).
pub const MAX_ENCRYPTED_OVERHEAD: usize = 256 + 64;

/// Apply ALPN, maximum fragment length and SNI from `credentials`
pub fn apply_optional_params<S: TlsSession>(session: &mut S, credentials: &Credentials) {
    if !credentials.alpn().is_empty() {
        set_alpn(session, credentials.alpn());
    }

    if let Some(len) = credentials.max_fragment_length() {
        set_max_fragment_length(session, len);
    }

    if let Some(host) = credentials.sni() {
        set_server_name(session, host);
    }
}

fn set_alpn<S: TlsSession>(session: &mut S, protocols: &[String]) {
    debug!(protocols = ?protocols, "Setting ALPN protos.");

    let wire = match encode_alpn(protocols) {
        Ok(wire) => wire,
        Err(e) => {
            error!(error = %e, "Cannot encode ALPN protos; skipping ALPN.");
            return;
        }
    };

    if let Err(e) = session.set_alpn_protocols(&wire) {
        error!(protocols = ?protocols, error = %e, "Failed to set ALPN protos.");
    }
}

fn set_max_fragment_length<S: TlsSession>(session: &mut S, len: u16) {
    debug!(len, "Setting max send fragment length.");

    match session.set_max_send_fragment(len) {
        Ok(()) => {
            // Room for a full encrypted record of the negotiated size
            session.set_read_buffer_len(usize::from(len) + MAX_ENCRYPTED_OVERHEAD);
        }
        Err(e) => {
            error!(len, error = %e, "Failed to set max send fragment length.");
        }
    }
}

fn set_server_name<S: TlsSession>(session: &mut S, host: &str) {
    debug!(host, "Setting server name for SNI.");

    if let Err(e) = session.set_server_name(host) {
        error!(host, error = %e, "Failed to set server name for SNI.");
    }
}
