//! HTTPS acceptor setup.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use rustls::pki_types::CertificateDer;
use tokio_rustls::TlsAcceptor;

/// Builds a TLS acceptor from a PEM certificate chain and a PEM private key.
pub fn load_tls_acceptor(cert_path: &Path, key_path: &Path) -> anyhow::Result<TlsAcceptor> {
    let cert_file = File::open(cert_path)
        .with_context(|| format!("failed to open certificate {}", cert_path.display()))?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<Result<_, _>>()
        .with_context(|| format!("failed to parse certificate {}", cert_path.display()))?;

    if certs.is_empty() {
        bail!("no certificates found in {}", cert_path.display());
    }

    let key_file = File::open(key_path)
        .with_context(|| format!("failed to open private key {}", key_path.display()))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .with_context(|| format!("failed to parse private key {}", key_path.display()))?
        .with_context(|| format!("no private key found in {}", key_path.display()))?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("invalid certificate/key pair")?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
