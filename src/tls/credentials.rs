//! Connection credentials
//!
//! `Credentials` describes what a single connect attempt should install and
//! negotiate: trust anchor, optional client identity, and the optional
//! handshake parameters (ALPN, maximum fragment length, SNI). It is only
//! read during connect; nothing in it is retained by the session.

use std::path::{Path, PathBuf};

/// Credential and negotiation settings for one connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    root_ca: Option<PathBuf>,
    client_cert: Option<PathBuf>,
    private_key: Option<PathBuf>,
    alpn: Vec<String>,
    max_fragment_length: Option<u16>,
    sni: Option<String>,
}

impl Credentials {
    /// Create a new credentials builder
    pub fn builder() -> CredentialsBuilder {
        CredentialsBuilder::default()
    }

    /// PEM file holding the trusted root CA certificate
    pub fn root_ca(&self) -> Option<&Path> {
        self.root_ca.as_deref()
    }

    /// PEM file holding the client certificate chain
    pub fn client_cert(&self) -> Option<&Path> {
        self.client_cert.as_deref()
    }

    /// PEM file holding the client private key
    pub fn private_key(&self) -> Option<&Path> {
        self.private_key.as_deref()
    }

    /// ALPN protocol identifiers, in preference order
    pub fn alpn(&self) -> &[String] {
        &self.alpn
    }

    /// Requested maximum fragment length; zero is treated as unset
    pub fn max_fragment_length(&self) -> Option<u16> {
        self.max_fragment_length.filter(|len| *len > 0)
    }

    /// Host name to advertise through SNI
    pub fn sni(&self) -> Option<&str> {
        self.sni.as_deref()
    }

    /// Whether both halves of a client identity are present
    pub fn wants_mutual_auth(&self) -> bool {
        self.client_cert.is_some() && self.private_key.is_some()
    }
}

/// Builder for `Credentials`
#[derive(Debug, Default)]
pub struct CredentialsBuilder {
    inner: Credentials,
}

impl CredentialsBuilder {
    /// Trust the root CA certificate stored in a PEM file
    pub fn root_ca(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.root_ca = Some(path.into());
        self
    }

    /// Present the certificate chain stored in a PEM file
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.client_cert = Some(path.into());
        self
    }

    /// Sign with the private key stored in a PEM file
    pub fn private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.private_key = Some(path.into());
        self
    }

    /// Set ALPN protocols
    pub fn alpn(mut self, protocols: &[&str]) -> Self {
        self.inner.alpn = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Request a maximum TLS fragment length
    pub fn max_fragment_length(mut self, len: u16) -> Self {
        self.inner.max_fragment_length = Some(len);
        self
    }

    /// Set SNI servername
    pub fn sni(mut self, host: impl Into<String>) -> Self {
        self.inner.sni = Some(host.into());
        self
    }

    pub fn build(self) -> Credentials {
        self.inner
    }
}

/// Encode ALPN protocol identifiers into the length-prefixed wire format.
///
/// Identifiers must be 1..=255 bytes long.
pub fn encode_alpn<S: AsRef<str>>(protocols: &[S]) -> Result<Vec<u8>, String> {
    let mut wire = Vec::with_capacity(protocols.iter().map(|p| p.as_ref().len() + 1).sum());
    for proto in protocols {
        let proto = proto.as_ref();
        let len = u8::try_from(proto.len())
            .map_err(|_| format!("ALPN protocol longer than 255 bytes: {}", proto))?;
        if len == 0 {
            return Err("empty ALPN protocol identifier".to_string());
        }
        wire.push(len);
        wire.extend_from_slice(proto.as_bytes());
    }
    Ok(wire)
}
