use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::error::THError;
use crate::io::Stream;
use crate::Result;

/// Wraps a proxy-provided stream with a TLS client session targeting the
/// destination host. The proxy only relays bytes; TLS terminates at the
/// destination, with SNI set to its hostname.
pub fn upgrade(stream: Box<dyn Stream>, host: &str) -> Result<Box<dyn Stream>> {
    let config = client_config()?;
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|err| THError::Tls(format!("invalid server name {host}: {err}")))?;
    let connection = ClientConnection::new(config, server_name)
        .map_err(|err| THError::Tls(format!("cannot start TLS session for {host}: {err}")))?;
    let mut tls_stream = StreamOwned::new(connection, stream);
    // complete the handshake eagerly so failures surface here instead of on
    // the first request write
    while tls_stream.conn.is_handshaking() {
        tls_stream
            .conn
            .complete_io(&mut tls_stream.sock)
            .map_err(|err| THError::Tls(format!("TLS handshake with {host} failed: {err}")))?;
    }
    Ok(Box::new(tls_stream))
}

fn client_config() -> Result<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        roots
            .add(cert)
            .map_err(|err| THError::Tls(format!("rejected native root certificate: {err}")))?;
    }
    if roots.is_empty() {
        return Err(THError::Tls("no trusted root certificates available".to_string()).into());
    }
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}
