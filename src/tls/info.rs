//! Negotiated session parameters
//!
//! Snapshot of what the handshake settled on, for callers that need to check
//! e.g. which ALPN protocol the server selected.

use super::cert::{peer_chain, CertInfo};
use openssl::ssl::{NameType, SslRef};

/// Parameters of an established session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Negotiated protocol version (e.g., "TLSv1.3")
    pub version: String,

    /// Negotiated cipher suite
    pub cipher: String,

    /// SNI servername sent by this client
    pub servername: Option<String>,

    /// ALPN protocol selected by the server
    pub alpn: Option<String>,

    /// Certificate chain (index 0 is peer cert)
    pub cert_chain: Vec<CertInfo>,
}

impl SessionInfo {
    /// Read the negotiated parameters from an OpenSSL session
    pub fn from_ssl(ssl: &SslRef) -> Self {
        SessionInfo {
            version: ssl.version_str().to_string(),
            cipher: ssl
                .current_cipher()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "<undef>".to_string()),
            servername: ssl.servername(NameType::HOST_NAME).map(|s| s.to_string()),
            alpn: ssl
                .selected_alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
            cert_chain: peer_chain(ssl),
        }
    }

    /// Peer certificate summary
    pub fn peer(&self) -> Option<&CertInfo> {
        self.cert_chain.first()
    }
}
