//! Network transport for mainframe connections
//!
//! The session core only needs a byte stream; [`Transport`] captures that
//! contract so a collaborator can hand in anything readable and writable
//! (including an already-wrapped TLS stream). [`NetStream`] is the built-in
//! implementation: plain TCP or rustls-wrapped TLS with the platform's
//! native roots plus the webpki bundle.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore};

use crate::error::TransportError;

/// Byte-stream transport contract
///
/// `set_read_timeout` is advisory: transports that cannot honor it (or whose
/// blocking behavior the collaborator manages externally) keep the default
/// no-op.
pub trait Transport: Read + Write {
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }
}

/// TLS client stream owning both the connection state and the socket
#[derive(Debug)]
pub struct TlsStream {
    conn: ClientConnection,
    stream: TcpStream,
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut s = rustls::Stream::new(&mut self.conn, &mut self.stream);
        s.read(buf)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut s = rustls::Stream::new(&mut self.conn, &mut self.stream);
        s.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut s = rustls::Stream::new(&mut self.conn, &mut self.stream);
        s.flush()
    }
}

/// Plain or TLS network stream
#[derive(Debug)]
pub enum NetStream {
    Plain(TcpStream),
    Tls(TlsStream),
}

impl Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            NetStream::Plain(t) => t.read(buf),
            NetStream::Tls(t) => t.read(buf),
        }
    }
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            NetStream::Plain(t) => t.write(buf),
            NetStream::Tls(t) => t.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            NetStream::Plain(t) => t.flush(),
            NetStream::Tls(t) => t.flush(),
        }
    }
}

impl Transport for NetStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            NetStream::Plain(t) => t.set_read_timeout(timeout),
            NetStream::Tls(t) => t.stream.set_read_timeout(timeout),
        }
    }
}

impl NetStream {
    /// Open a connection to `host:port`, optionally wrapped in TLS
    pub fn connect(
        host: &str,
        port: u16,
        tls: bool,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::InvalidAddress {
                address: format!("{host}:{port}"),
            })?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress {
                address: format!("{host}:{port}"),
            })?;

        debug!("connecting to {addr} (tls={tls})");
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
            std::io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused {
                host: host.to_string(),
                port,
            },
            std::io::ErrorKind::TimedOut => TransportError::Timeout {
                host: host.to_string(),
                port,
                timeout_seconds: timeout.as_secs(),
            },
            _ => TransportError::Io(e),
        })?;
        stream.set_nodelay(true).ok();

        if !tls {
            info!("connected to {host}:{port}");
            return Ok(NetStream::Plain(stream));
        }

        let mut roots = RootCertStore::empty();
        if let Ok(certs) = rustls_native_certs::load_native_certs() {
            for cert in certs {
                let _ = roots.add(cert);
            }
        }
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let server_name =
            ServerName::try_from(host.to_string()).map_err(|e| TransportError::Tls {
                message: format!("invalid server name {host}: {e}"),
            })?;
        let conn =
            ClientConnection::new(Arc::new(config), server_name).map_err(|e| {
                TransportError::Tls {
                    message: e.to_string(),
                }
            })?;

        info!("TLS connection established to {host}:{port}");
        Ok(NetStream::Tls(TlsStream { conn, stream }))
    }
}
