//! Shared fixtures: a throwaway PKI and a loopback TLS server

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{
    select_next_proto, AlpnError, ErrorCode, Ssl, SslContextBuilder, SslMethod, SslStream,
    SslVerifyMode,
};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509Name, X509NameBuilder, X509};
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    name.build()
}

/// Certificate and key written to disk
pub struct Identity {
    pub cert: X509,
    pub key: PKey<Private>,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// A root CA plus the directory its issued files live in
pub struct Pki {
    dir: TempDir,
    ca: X509,
    ca_key: PKey<Private>,
    serial: std::cell::Cell<u32>,
}

impl Pki {
    pub fn new(ca_name: &str) -> Self {
        let ca_key = ec_key();
        let subject = name(ca_name);

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&subject).unwrap();
        builder.set_issuer_name(&subject).unwrap();
        builder.set_pubkey(&ca_key).unwrap();
        builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .unwrap();
        builder.append_extension(ski).unwrap();
        builder.sign(&ca_key, MessageDigest::sha256()).unwrap();

        Pki {
            dir: tempfile::tempdir().unwrap(),
            ca: builder.build(),
            ca_key,
            serial: std::cell::Cell::new(1),
        }
    }

    pub fn ca(&self) -> &X509 {
        &self.ca
    }

    /// Root CA certificate as a PEM file
    pub fn ca_path(&self) -> PathBuf {
        self.write("root-ca.pem", &self.ca.to_pem().unwrap())
    }

    pub fn write(&self, file: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(file);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Issue a leaf certificate valid for localhost and 127.0.0.1
    pub fn issue(&self, cn: &str) -> Identity {
        let key = ec_key();
        self.serial.set(self.serial.get() + 1);

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(self.serial.get())
            .unwrap()
            .to_asn1_integer()
            .unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name(cn)).unwrap();
        builder.set_issuer_name(self.ca.subject_name()).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
        builder
            .append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        builder
            .append_extension(KeyUsage::new().critical().digital_signature().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                ExtendedKeyUsage::new()
                    .server_auth()
                    .client_auth()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let san = SubjectAlternativeName::new()
            .dns("localhost")
            .ip("127.0.0.1")
            .build(&builder.x509v3_context(Some(&self.ca), None))
            .unwrap();
        builder.append_extension(san).unwrap();
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(&self.ca), None))
            .unwrap();
        builder.append_extension(aki).unwrap();
        builder.sign(&self.ca_key, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        let cert_path = self.write(&format!("{}.pem", cn), &cert.to_pem().unwrap());
        let key_path = self.write(
            &format!("{}.key", cn),
            &key.private_key_to_pem_pkcs8().unwrap(),
        );

        Identity {
            cert,
            key,
            cert_path,
            key_path,
        }
    }
}

/// How the loopback server behaves
#[derive(Default)]
pub struct ServerOptions {
    /// Protocols the server is willing to select, in preference order
    pub alpn: Vec<&'static str>,
    /// Require a client certificate issued by this CA
    pub client_ca: Option<X509>,
    /// After the handshake, stay silent this long and then drop the connection
    pub silent_for: Option<Duration>,
}

/// What the server observed on its single connection
#[derive(Debug, Default)]
pub struct ServerReport {
    pub handshake_ok: bool,
    pub client_cn: Option<String>,
    pub servername: Option<String>,
    pub received: Vec<u8>,
    pub saw_close_notify: bool,
}

fn alpn_wire(protocols: &[&str]) -> Vec<u8> {
    let mut wire = Vec::new();
    for proto in protocols {
        wire.push(proto.len() as u8);
        wire.extend_from_slice(proto.as_bytes());
    }
    wire
}

/// Accept one TLS connection on 127.0.0.1, echo everything it receives and
/// answer the client's close-notify with its own
pub fn spawn_echo_server(
    identity: &Identity,
    options: ServerOptions,
) -> (u16, JoinHandle<ServerReport>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut builder = SslContextBuilder::new(SslMethod::tls_server()).unwrap();
    builder.set_certificate(&identity.cert).unwrap();
    builder.set_private_key(&identity.key).unwrap();

    if !options.alpn.is_empty() {
        // The callback hands back a slice of the server list, so it must outlive the context
        let server_wire: &'static [u8] = Box::leak(alpn_wire(&options.alpn).into_boxed_slice());
        builder.set_alpn_select_callback(move |_, client| {
            select_next_proto(server_wire, client).ok_or(AlpnError::NOACK)
        });
    }

    if let Some(ca) = options.client_ca {
        builder.cert_store_mut().add_cert(ca).unwrap();
        builder.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
    }

    let ctx = builder.build();

    let handle = thread::spawn(move || {
        let mut report = ServerReport::default();
        let (tcp_stream, _) = match listener.accept() {
            Ok(conn) => conn,
            Err(_) => return report,
        };

        let ssl = Ssl::new(&ctx).unwrap();
        let mut stream = match SslStream::new(ssl, tcp_stream) {
            Ok(stream) => stream,
            Err(_) => return report,
        };
        if stream.accept().is_err() {
            return report;
        }
        report.handshake_ok = true;
        report.servername = stream
            .ssl()
            .servername(openssl::ssl::NameType::HOST_NAME)
            .map(str::to_string);
        report.client_cn = stream.ssl().peer_certificate().and_then(|cert| {
            cert.subject_name()
                .entries_by_nid(Nid::COMMONNAME)
                .next()
                .map(|entry| String::from_utf8_lossy(entry.data().as_slice()).into_owned())
        });

        if let Some(silence) = options.silent_for {
            thread::sleep(silence);
            return report;
        }

        let mut buf = [0u8; 4096];
        loop {
            match stream.ssl_read(&mut buf) {
                Ok(n) => {
                    report.received.extend_from_slice(&buf[..n]);
                    if stream.ssl_write(&buf[..n]).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    report.saw_close_notify = e.code() == ErrorCode::ZERO_RETURN;
                    break;
                }
            }
        }

        let _ = stream.shutdown();
        report
    });

    (port, handle)
}
