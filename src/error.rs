//! Error types for TN3270R operations
//!
//! Transport and negotiation failures surface as structured errors from
//! `connect`, `poll_screen` and `send_aid`. Malformed sub-structures inside an
//! otherwise valid record are never errors; they are dropped and counted
//! (see `DataStreamProcessor::malformed_records`).

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Top-level error type for TN3270R operations
#[derive(Debug)]
pub enum TN3270Error {
    /// Network transport errors
    Transport(TransportError),
    /// TN3270E negotiation errors
    Negotiation(NegotiationError),
    /// Operation requires an established session
    NotConnected,
}

/// Network transport related errors
#[derive(Debug)]
pub enum TransportError {
    /// Connection refused by remote host
    ConnectionRefused { host: String, port: u16 },
    /// Connection or read timeout
    Timeout { host: String, port: u16, timeout_seconds: u64 },
    /// Remote side closed the connection (zero-byte read)
    ConnectionClosed,
    /// Host name did not resolve to an address
    InvalidAddress { address: String },
    /// TLS setup or handshake failure
    Tls { message: String },
    /// Other I/O failure
    Io(io::Error),
}

/// TN3270E negotiation errors
#[derive(Debug)]
pub enum NegotiationError {
    /// Host sent DEVICE-TYPE REJECT and no LU-name fallback remained
    Rejected { reason: u8 },
}

impl fmt::Display for TN3270Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TN3270Error::Transport(err) => write!(f, "Transport error: {err}"),
            TN3270Error::Negotiation(err) => write!(f, "Negotiation error: {err}"),
            TN3270Error::NotConnected => write!(f, "Session is not connected"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionRefused { host, port } =>
                write!(f, "Connection refused to {host}:{port}"),
            TransportError::Timeout { host, port, timeout_seconds } =>
                write!(f, "Timeout talking to {host}:{port} after {timeout_seconds}s"),
            TransportError::ConnectionClosed =>
                write!(f, "Connection closed by remote host"),
            TransportError::InvalidAddress { address } =>
                write!(f, "Invalid network address: {address}"),
            TransportError::Tls { message } =>
                write!(f, "TLS error: {message}"),
            TransportError::Io(err) =>
                write!(f, "I/O error: {err}"),
        }
    }
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::Rejected { reason } =>
                write!(f, "Host rejected device-type request (reason 0x{reason:02X})"),
        }
    }
}

impl StdError for TN3270Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TN3270Error::Transport(err) => Some(err),
            TN3270Error::Negotiation(err) => Some(err),
            TN3270Error::NotConnected => None,
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl StdError for NegotiationError {}

impl From<TransportError> for TN3270Error {
    fn from(err: TransportError) -> Self {
        TN3270Error::Transport(err)
    }
}

impl From<NegotiationError> for TN3270Error {
    fn from(err: NegotiationError) -> Self {
        TN3270Error::Negotiation(err)
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof =>
                TransportError::ConnectionClosed,
            _ => TransportError::Io(err),
        }
    }
}

impl From<io::Error> for TN3270Error {
    fn from(err: io::Error) -> Self {
        TN3270Error::Transport(TransportError::from(err))
    }
}

/// Result type alias for TN3270R operations
pub type TN3270Result<T> = Result<T, TN3270Error>;
