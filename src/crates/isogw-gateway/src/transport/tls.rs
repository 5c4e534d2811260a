//! rustls client configuration for the upstream tunnel.

use std::sync::Arc;
use std::time::SystemTime;

use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use thiserror::Error;
use tracing::warn;

/// TLS setup failures, all fatal at connector construction.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to load platform root certificates: {0}")]
    NativeRoots(std::io::Error),

    #[error("failed to add root certificate: {0}")]
    AddRoot(rustls::Error),
}

/// Builds the client configuration.
///
/// With `insecure` the verifier accepts any certificate the upstream
/// presents; the wire is then confidential but unauthenticated.  Intended
/// for acquirer links inside operator-controlled networks only.
///
/// # Errors
///
/// Returns [`TlsError`] when the platform root store cannot be loaded.
pub fn client_config(insecure: bool) -> Result<Arc<ClientConfig>, TlsError> {
    if insecure {
        warn!("TLS certificate verification disabled (--tls-insecure)");
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
            .with_no_client_auth();
        return Ok(Arc::new(config));
    }

    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().map_err(TlsError::NativeRoots)? {
        roots.add(&Certificate(cert.0)).map_err(TlsError::AddRoot)?;
    }
    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Verifier that trusts every certificate.
struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}
