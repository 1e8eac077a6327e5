//! Credential installation
//!
//! Loads the root CA, client certificate chain and private key into a fresh
//! configuration object, in that order. Each step runs only when its path is
//! present and only if the previous step succeeded.

use super::credentials::Credentials;
use super::engine::{EngineError, TlsConfig, TlsEngine};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

const ROOT_CA_LABEL: &str = "root CA certificate";
const CLIENT_CERT_LABEL: &str = "client certificate";
const CLIENT_KEY_LABEL: &str = "client private key";

/// Credential installation errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("cannot open root CA file {path}: {source}")]
    RootCaOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse root CA from {path}: {source}")]
    RootCaParse {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("trust store rejected root CA: {0}")]
    TrustStore(#[source] EngineError),

    #[error("failed to import client certificate at {path}: {source}")]
    ClientCertificate {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("failed to import client private key at {path}: {source}")]
    PrivateKey {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("client certificate and private key must be supplied together")]
    IncompleteIdentity,
}

/// Install every credential present in `credentials` into `config`.
///
/// Succeeds trivially when no paths are set.
pub fn install_credentials<E: TlsEngine>(
    engine: &E,
    config: &mut E::Config,
    credentials: &Credentials,
) -> Result<(), CredentialError> {
    if credentials.client_cert().is_some() != credentials.private_key().is_some() {
        error!(
            client_cert = credentials.client_cert().is_some(),
            private_key = credentials.private_key().is_some(),
            "Mutual authentication needs both a client certificate and a private key."
        );
        return Err(CredentialError::IncompleteIdentity);
    }

    if let Some(path) = credentials.root_ca() {
        install_root_ca(engine, config, path)?;
    }

    if let Some(path) = credentials.client_cert() {
        install_client_cert(config, path)?;
    }

    if let Some(path) = credentials.private_key() {
        install_private_key(config, path)?;
    }

    Ok(())
}

/// Add the single PEM certificate stored at `path` to the trust store
pub fn install_root_ca<E: TlsEngine>(
    engine: &E,
    config: &mut E::Config,
    path: &Path,
) -> Result<(), CredentialError> {
    log_path(path, ROOT_CA_LABEL);

    // The handle only lives for this block and is released on every exit
    let pem = {
        let mut file = File::open(path).map_err(|source| {
            error!(path = %path.display(), error = %source, "Failed to open the root CA certificate file.");
            CredentialError::RootCaOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut pem = Vec::new();
        file.read_to_end(&mut pem).map_err(|source| {
            error!(path = %path.display(), error = %source, "Failed to read the root CA certificate file.");
            CredentialError::RootCaOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;
        pem
    };

    let cert = engine.parse_certificate(&pem).map_err(|source| {
        error!(error = %source, "Failed to parse root CA.");
        CredentialError::RootCaParse {
            path: path.to_path_buf(),
            source,
        }
    })?;

    config.add_trust_anchor(cert).map_err(|e| {
        error!(error = %e, "Failed to add root CA to certificate store.");
        CredentialError::TrustStore(e)
    })?;

    debug!("Successfully imported root CA.");
    Ok(())
}

/// Load the client certificate chain stored at `path`
pub fn install_client_cert<C: TlsConfig>(config: &mut C, path: &Path) -> Result<(), CredentialError> {
    log_path(path, CLIENT_CERT_LABEL);

    config.load_certificate_chain(path).map_err(|source| {
        error!(path = %path.display(), error = %source, "Failed to import client certificate.");
        CredentialError::ClientCertificate {
            path: path.to_path_buf(),
            source,
        }
    })?;

    debug!("Successfully imported client certificate.");
    Ok(())
}

/// Load the client private key stored at `path`
pub fn install_private_key<C: TlsConfig>(config: &mut C, path: &Path) -> Result<(), CredentialError> {
    log_path(path, CLIENT_KEY_LABEL);

    config.load_private_key(path).map_err(|source| {
        error!(path = %path.display(), error = %source, "Failed to import client certificate private key.");
        CredentialError::PrivateKey {
            path: path.to_path_buf(),
            source,
        }
    })?;

    debug!("Successfully imported client certificate private key.");
    Ok(())
}

fn log_path(path: &Path, label: &str) {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    debug!(path = %absolute.display(), "Attempting to open {}.", label);
}
