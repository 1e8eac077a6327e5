//! OpenSSL-backed TLS engine
//!
//! Implements the engine seam with the `openssl` crate. A few knobs the safe
//! wrapper does not expose (maximum send fragment, default read buffer
//! length) go through `openssl-sys` directly.

use super::engine::{
    EngineError, IoErrorKind, IoFailure, PeerVerification, ShutdownState, TlsConfig, TlsEngine,
    TlsSession,
};
use super::info::SessionInfo;
use foreign_types::ForeignTypeRef;
use libc::{c_int, c_long, size_t};
use openssl::ssl::{
    ErrorCode, ShutdownResult, Ssl, SslContextBuilder, SslFiletype, SslMethod, SslMode, SslRef,
    SslStream, SslVerifyMode,
};
use openssl::x509::{X509VerifyResult, X509};
use std::net::TcpStream;
use std::path::Path;
use std::ptr;

/// `SSL_set_max_send_fragment` is a macro over `SSL_ctrl`
const SSL_CTRL_SET_MAX_SEND_FRAGMENT: c_int = 52;

extern "C" {
    fn SSL_set_default_read_buffer_len(s: *mut openssl_sys::SSL, len: size_t);
}

/// TLS engine backed by the system OpenSSL
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslEngine;

impl OpenSslEngine {
    pub fn new() -> Self {
        OpenSslEngine
    }
}

impl TlsEngine for OpenSslEngine {
    type Socket = TcpStream;
    type Certificate = X509;
    type Config = OpenSslConfig;
    type Session = OpenSslSession;

    fn new_client_config(&self) -> Result<OpenSslConfig, EngineError> {
        let builder = SslContextBuilder::new(SslMethod::tls_client())?;
        Ok(OpenSslConfig { builder })
    }

    fn parse_certificate(&self, pem: &[u8]) -> Result<X509, EngineError> {
        Ok(X509::from_pem(pem)?)
    }

    fn new_session(&self, config: OpenSslConfig) -> Result<OpenSslSession, EngineError> {
        // The context is reference counted inside OpenSSL; the session keeps
        // it alive after our handle drops here.
        let ctx = config.builder.build();
        let ssl = Ssl::new(&ctx)?;
        Ok(OpenSslSession {
            ssl: Some(ssl),
            socket: None,
            stream: None,
        })
    }
}

/// Client context under construction
pub struct OpenSslConfig {
    builder: SslContextBuilder,
}

impl TlsConfig for OpenSslConfig {
    type Certificate = X509;

    fn enable_auto_retry(&mut self) {
        self.builder.set_mode(SslMode::AUTO_RETRY);
    }

    fn add_trust_anchor(&mut self, cert: X509) -> Result<(), EngineError> {
        self.builder.cert_store_mut().add_cert(cert)?;
        Ok(())
    }

    fn load_certificate_chain(&mut self, path: &Path) -> Result<(), EngineError> {
        self.builder.set_certificate_chain_file(path)?;
        Ok(())
    }

    fn load_private_key(&mut self, path: &Path) -> Result<(), EngineError> {
        self.builder.set_private_key_file(path, SslFiletype::PEM)?;
        self.builder.check_private_key()?;
        Ok(())
    }
}

/// OpenSSL session
///
/// Before the handshake the `Ssl` and the bound socket are held separately
/// so optional parameters can still be applied; the handshake joins them
/// into an `SslStream`.
pub struct OpenSslSession {
    ssl: Option<Ssl>,
    socket: Option<TcpStream>,
    stream: Option<SslStream<TcpStream>>,
}

impl OpenSslSession {
    fn pending(&mut self) -> Result<&mut Ssl, EngineError> {
        self.ssl
            .as_mut()
            .ok_or_else(|| EngineError::new("session handshake already started"))
    }

    fn ssl_ref(&self) -> Option<&SslRef> {
        match (&self.stream, &self.ssl) {
            (Some(stream), _) => Some(stream.ssl()),
            (None, Some(ssl)) => Some(&**ssl),
            (None, None) => None,
        }
    }
}

impl TlsSession for OpenSslSession {
    type Socket = TcpStream;

    fn require_peer_verification(&mut self) {
        if let Some(ssl) = self.ssl.as_mut() {
            ssl.set_verify(SslVerifyMode::PEER);
        }
    }

    fn bind(&mut self, socket: &TcpStream) -> Result<(), EngineError> {
        self.pending()?;
        let socket = socket
            .try_clone()
            .map_err(|e| EngineError::new(format!("cannot associate socket with session: {}", e)))?;
        self.socket = Some(socket);
        Ok(())
    }

    fn set_alpn_protocols(&mut self, wire: &[u8]) -> Result<(), EngineError> {
        self.pending()?.set_alpn_protos(wire)?;
        Ok(())
    }

    fn set_max_send_fragment(&mut self, len: u16) -> Result<(), EngineError> {
        let ssl: &SslRef = self.pending()?;
        // SAFETY: `ssl` is a live SSL object owned by this session.
        let ret = unsafe {
            openssl_sys::SSL_ctrl(
                ssl.as_ptr(),
                SSL_CTRL_SET_MAX_SEND_FRAGMENT,
                c_long::from(len),
                ptr::null_mut(),
            )
        };
        if ret == 1 {
            Ok(())
        } else {
            Err(EngineError::new(format!(
                "max send fragment {} outside the supported range",
                len
            )))
        }
    }

    fn set_read_buffer_len(&mut self, len: usize) {
        if let Some(ssl) = self.ssl.as_ref() {
            let ssl: &SslRef = ssl;
            // SAFETY: `ssl` is a live SSL object owned by this session.
            unsafe { SSL_set_default_read_buffer_len(ssl.as_ptr(), len) };
        }
    }

    fn set_server_name(&mut self, host: &str) -> Result<(), EngineError> {
        self.pending()?.set_hostname(host)?;
        Ok(())
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        let ssl = self
            .ssl
            .take()
            .ok_or_else(|| EngineError::new("session handshake already started"))?;
        let socket = self
            .socket
            .take()
            .ok_or_else(|| EngineError::new("session is not bound to a socket"))?;

        let mut stream = SslStream::new(ssl, socket)?;
        let result = stream.connect();
        self.stream = Some(stream);
        result.map_err(|e| EngineError::new(e.to_string()))
    }

    fn verify_result(&self) -> PeerVerification {
        let Some(ssl) = self.ssl_ref() else {
            return PeerVerification::Failed {
                code: -1,
                reason: "no session".to_string(),
            };
        };

        let result = ssl.verify_result();
        if result == X509VerifyResult::OK {
            PeerVerification::Ok
        } else {
            PeerVerification::Failed {
                code: result.as_raw(),
                reason: result.error_string().to_string(),
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoFailure> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        stream.ssl_read(buf).map_err(io_failure)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoFailure> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        stream.ssl_write(buf).map_err(io_failure)
    }

    fn shutdown(&mut self) -> ShutdownState {
        let Some(stream) = self.stream.as_mut() else {
            return ShutdownState::Failed("session never started a handshake".to_string());
        };

        match stream.shutdown() {
            Ok(ShutdownResult::Sent) => ShutdownState::Sent,
            Ok(ShutdownResult::Received) => ShutdownState::Received,
            Err(e) => ShutdownState::Failed(e.to_string()),
        }
    }

    fn info(&self) -> SessionInfo {
        self.ssl_ref().map(SessionInfo::from_ssl).unwrap_or_default()
    }
}

fn not_connected() -> IoFailure {
    IoFailure::new(-1, IoErrorKind::NotConnected, "session has not completed a handshake")
}

/// Reconstruct the `SSL_read`/`SSL_write` return value from the error:
/// 0 for an orderly or abrupt EOF, -1 otherwise.
fn io_failure(e: openssl::ssl::Error) -> IoFailure {
    let code = e.code();
    let kind = if code == ErrorCode::WANT_READ {
        IoErrorKind::WantRead
    } else if code == ErrorCode::WANT_WRITE {
        IoErrorKind::WantWrite
    } else if code == ErrorCode::ZERO_RETURN {
        IoErrorKind::ZeroReturn
    } else if code == ErrorCode::SYSCALL {
        IoErrorKind::Syscall
    } else {
        IoErrorKind::Protocol
    };

    let ret = match kind {
        IoErrorKind::ZeroReturn => 0,
        IoErrorKind::Syscall if e.io_error().is_none() => 0,
        _ => -1,
    };

    IoFailure::new(ret, kind, e.to_string())
}
