//! TLS acceptor construction from configured credential paths.
//!
//! Credentials are consumed as file paths: a PEM certificate chain and a
//! PEM private key. Bad or unreadable material is a fatal startup error,
//! surfaced before the listener starts accepting.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig as RustlsConfig;
use tokio_rustls::TlsAcceptor;
use tracing::debug;

use prism_config::TlsPaths;

use crate::error::StartupError;

/// Build a TLS acceptor from PEM credential files.
///
/// # Errors
///
/// Returns [`StartupError::TlsRead`] when either file cannot be read and
/// [`StartupError::TlsMaterial`] when the material does not form a usable
/// key/certificate pair.
pub fn build_acceptor(paths: &TlsPaths) -> Result<TlsAcceptor, StartupError> {
    let certs = load_certs(&paths.cert)?;
    if certs.is_empty() {
        return Err(StartupError::TlsMaterial(format!(
            "no certificates found in {}",
            paths.cert.display()
        )));
    }
    let key = load_key(&paths.key)?;

    let config = RustlsConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| StartupError::TlsMaterial(e.to_string()))?;

    debug!(cert = %paths.cert.display(), "TLS acceptor ready");
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, StartupError> {
    let file = File::open(path).map_err(|source| StartupError::TlsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| StartupError::TlsRead {
            path: path.to_path_buf(),
            source,
        })
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, StartupError> {
    let file = File::open(path).map_err(|source| StartupError::TlsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| StartupError::TlsRead {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| {
            StartupError::TlsMaterial(format!("no private key found in {}", path.display()))
        })
}
