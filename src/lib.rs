//! # tn3270r
//!
//! A TN3270E terminal emulator core: the protocol engine that connects to an
//! IBM mainframe over Telnet/TN3270E, maintains the 3270 screen buffer, and
//! exchanges data streams with the host. Rendering, key bindings, credential
//! storage and scripted navigation are collaborators that consume this crate
//! through [`TN3270Session`] and [`Screen`].
//!
//! ```no_run
//! use tn3270r::{AidKey, ConnectionConfig, TN3270Session};
//!
//! let mut session = TN3270Session::new(ConnectionConfig::new("mvs.example.com", 23));
//! session.connect()?;
//! if let Some(screen) = session.poll_screen()? {
//!     println!("{}", screen.to_text());
//! }
//! session.send_aid(AidKey::Enter, &[(11, "LOGON TSO".to_string())])?;
//! # Ok::<(), tn3270r::TN3270Error>(())
//! ```
//!
//! The crate logs through the `log` facade and never installs a logger.

/// 3270 DATA STREAM CODES: commands, orders, AID keys, attribute bits
pub mod codes;

/// EBCDIC TRANSLATION: EBCDIC to display-character conversion tables
pub mod ebcdic;

/// BUFFER ADDRESSING: 12/14-bit buffer-address encoding and decoding
pub mod addressing;

/// FIELD MANAGEMENT: field attributes, ordering, navigation, MDT lifecycle
pub mod field;

/// SCREEN MODEL: fixed-geometry cell buffer, cursor, text queries
pub mod screen;

/// TELNET FRAMING: IAC escapes, EOR record boundaries, control events
pub mod telnet;

/// OPTION NEGOTIATION: telnet option replies and the TN3270E handshake
pub mod telnet_negotiation;

/// DATA STREAM PROCESSING: command dispatch, order interpreter, AID builder
pub mod protocol;

/// NETWORK TRANSPORT: byte-stream contract, plain TCP and rustls TLS
pub mod network;

/// SESSION: the public client API
pub mod session;

/// CONFIGURATION: descriptive connection parameters
pub mod config;

/// ERROR HANDLING: structured error types
pub mod error;

// Re-exports for easy access
pub use codes::{AidKey, CommandCode};
pub use config::ConnectionConfig;
pub use error::{NegotiationError, TN3270Error, TN3270Result, TransportError};
pub use field::{Field, FieldDisplay};
pub use network::{NetStream, Transport};
pub use screen::Screen;
pub use session::TN3270Session;
