//! Connection configuration
//!
//! Descriptive parameters for a session: where to connect, how to identify
//! the terminal, and how long to wait. Credentials are deliberately absent;
//! the collaborator that owns the settings store types them into input
//! fields like any other operator input.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default terminal type reported during negotiation
pub const DEFAULT_TERMINAL_TYPE: &str = "IBM-3278-2-E";

/// Parameters describing one mainframe connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host name or address
    pub host: String,
    /// TCP port (23 plain, commonly 992 for TLS)
    pub port: u16,
    /// Wrap the connection in TLS
    pub tls: bool,
    /// Terminal type sent in TERMINAL-TYPE and TN3270E negotiation
    pub terminal_type: String,
    /// Specific LU name to request, if any
    pub lu_name: Option<String>,
    /// Timeout for connect and for negotiation reads, in seconds
    pub connect_timeout_secs: u64,
    /// Read timeout for `poll_screen`, in milliseconds
    pub poll_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 23,
            tls: false,
            terminal_type: DEFAULT_TERMINAL_TYPE.to_string(),
            lu_name: None,
            connect_timeout_secs: 30,
            poll_timeout_ms: 250,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Self::default()
        }
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_terminal_type(mut self, terminal_type: &str) -> Self {
        self.terminal_type = terminal_type.to_string();
        self
    }

    pub fn with_lu_name(mut self, lu_name: &str) -> Self {
        self.lu_name = Some(lu_name.to_string());
        self
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write the configuration to a JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Read a configuration from a JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
