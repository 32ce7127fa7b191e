//! TLS server configuration from PEM files.

use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;

use crate::config::{StartupError, TlsPaths};

/// Load the certificate chain and private key. Any failure is fatal.
pub fn load_server_config(paths: &TlsPaths) -> Result<Arc<ServerConfig>, StartupError> {
    let certs = CertificateDer::pem_file_iter(&paths.cert)
        .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
        .map_err(|e| {
            StartupError::new(
                "ERR_TLS_LOAD",
                format!("failed to read certificate {}: {}", paths.cert.display(), e),
            )
        })?;
    if certs.is_empty() {
        return Err(StartupError::new(
            "ERR_TLS_LOAD",
            format!("no certificate found in {}", paths.cert.display()),
        ));
    }

    let key = PrivateKeyDer::from_pem_file(&paths.key).map_err(|e| {
        StartupError::new(
            "ERR_TLS_LOAD",
            format!("failed to read private key {}: {}", paths.key.display(), e),
        )
    })?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| StartupError::new("ERR_TLS_LOAD", format!("invalid TLS pair: {}", e)))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}
