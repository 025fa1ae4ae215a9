//! Byte transports for the tokio driver.
//!
//! [`Transport`] is the seam between [`Client`](crate::client::Client) and
//! the network; tests substitute a scripted implementation.
//! [`TcpTransport`] is the real one: TCP with OS keepalive, optionally
//! wrapped in TLS.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, pki_types::ServerName, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::config::TlsOptions;
use crate::error::TransportError;

/// An ordered byte stream to one server.
#[async_trait]
pub trait Transport: Send {
    /// Open the connection. Replaces any previous one.
    async fn connect(&mut self, host: &str, port: u16, tls: &TlsOptions) -> Result<(), TransportError>;

    /// Write all of `data`.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read whatever is available into `buf`. Returns 0 at end of stream.
    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, TransportError>;

    /// Shut the connection down. Closing a closed transport is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[allow(clippy::large_enum_variant)]
enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

/// TCP transport with optional TLS.
#[derive(Default)]
pub struct TcpTransport {
    stream: Option<Stream>,
}

impl TcpTransport {
    /// Unconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a stream is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.stream {
            None => "closed",
            Some(Stream::Plain(_)) => "plain",
            Some(Stream::Tls(_)) => "tls",
        };
        f.debug_struct("TcpTransport").field("stream", &kind).finish()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, host: &str, port: u16, tls: &TlsOptions) -> Result<(), TransportError> {
        self.stream = None;

        let tcp = TcpStream::connect((host, port)).await?;
        if let Err(e) = Self::enable_keepalive(&tcp) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        if let Err(e) = tcp.set_nodelay(true) {
            debug!("failed to set TCP_NODELAY: {}", e);
        }

        if !tls.enabled {
            self.stream = Some(Stream::Plain(tcp));
            return Ok(());
        }

        let config = if tls.verify {
            verifying_config()
        } else {
            warn!(host, "TLS certificate verification disabled");
            insecure_config()
        };
        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|_| TransportError::InvalidServerName(host.to_owned()))?;
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        debug!(host, "TLS handshake complete");

        self.stream = Some(Stream::Tls(Box::new(stream)));
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match self.stream.as_mut() {
            Some(Stream::Plain(s)) => s.write_all(data).await?,
            Some(Stream::Tls(s)) => {
                s.write_all(data).await?;
                s.flush().await?;
            }
            None => return Err(TransportError::NotConnected),
        }
        Ok(())
    }

    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, TransportError> {
        let n = match self.stream.as_mut() {
            Some(Stream::Plain(s)) => s.read_buf(buf).await?,
            Some(Stream::Tls(s)) => s.read_buf(buf).await?,
            None => return Err(TransportError::NotConnected),
        };
        Ok(n)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let result = match self.stream.take() {
            Some(Stream::Plain(mut s)) => s.shutdown().await,
            Some(Stream::Tls(mut s)) => s.shutdown().await,
            None => return Ok(()),
        };
        // The peer may already be gone; a failed shutdown still closes.
        if let Err(e) = result {
            debug!("shutdown: {}", e);
        }
        Ok(())
    }
}

fn verifying_config() -> ClientConfig {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for e in &certs.errors {
        warn!("error loading native certs: {}", e);
    }
    let (added, ignored) = roots.add_parsable_certificates(certs.certs);
    debug!(added, ignored, "loaded native root certificates");

    ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

fn insecure_config() -> ClientConfig {
    ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerifier))
        .with_no_client_auth()
}

/// Accepts any server certificate. Only used when `verify` is off.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
