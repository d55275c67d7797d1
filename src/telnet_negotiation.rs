//! Telnet option negotiation and the TN3270E handshake
//!
//! The client is passive: the host solicits options and the negotiator
//! answers from a fixed table, accepting BINARY, EOR, TERMINAL-TYPE and
//! TN3270E and refusing everything else. On top of that runs the TN3270E
//! sub-negotiation (RFC 2355): the host asks for a device type, the client
//! requests its terminal type with an optional LU name, and a final empty
//! FUNCTIONS exchange settles the session in basic 3270 mode.
//!
//! Replies accumulate in an output buffer; the session drains it onto the
//! transport after each batch of events.

use log::{debug, info, warn};

use crate::error::NegotiationError;
use crate::telnet::{TelnetCommand, TelnetEvent, TelnetFramer, TelnetOption};

/// TN3270E sub-command codes (RFC 2355)
pub const TN3270E_CONNECT: u8 = 0x01;
pub const TN3270E_DEVICE_TYPE: u8 = 0x02;
pub const TN3270E_FUNCTIONS: u8 = 0x03;
pub const TN3270E_IS: u8 = 0x04;
pub const TN3270E_REJECT: u8 = 0x06;
pub const TN3270E_REQUEST: u8 = 0x07;
pub const TN3270E_SEND: u8 = 0x08;

/// TERMINAL-TYPE subnegotiation codes (RFC 1091)
const TTYPE_IS: u8 = 0;
const TTYPE_SEND: u8 = 1;

/// Telnet option negotiator for a TN3270E client session
#[derive(Debug)]
pub struct TelnetNegotiator {
    terminal_type: String,
    /// LU name to request from the host, dropped after a REJECT fallback
    requested_lu: Option<String>,
    /// LU name the host assigned via DEVICE-TYPE IS ... CONNECT
    assigned_lu: Option<String>,
    binary_mode: bool,
    tn3270e_mode: bool,
    tn3270e_negotiated: bool,
    output_buffer: Vec<u8>,
}

impl TelnetNegotiator {
    pub fn new(terminal_type: &str, requested_lu: Option<String>) -> Self {
        Self {
            terminal_type: terminal_type.to_string(),
            requested_lu,
            assigned_lu: None,
            binary_mode: false,
            tn3270e_mode: false,
            tn3270e_negotiated: false,
            output_buffer: Vec::new(),
        }
    }

    /// Forget all negotiated state for a fresh connection
    pub fn reset(&mut self, requested_lu: Option<String>) {
        self.requested_lu = requested_lu;
        self.assigned_lu = None;
        self.binary_mode = false;
        self.tn3270e_mode = false;
        self.tn3270e_negotiated = false;
        self.output_buffer.clear();
    }

    pub fn binary_mode(&self) -> bool {
        self.binary_mode
    }

    pub fn tn3270e_mode(&self) -> bool {
        self.tn3270e_mode
    }

    pub fn tn3270e_negotiated(&self) -> bool {
        self.tn3270e_negotiated
    }

    pub fn assigned_lu(&self) -> Option<&str> {
        self.assigned_lu.as_deref()
    }

    /// Pull the replies accumulated so far
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output_buffer)
    }

    /// Feed one control event from the framer
    pub fn handle_event(&mut self, event: &TelnetEvent) -> Result<(), NegotiationError> {
        match event {
            TelnetEvent::Do(option) => {
                self.handle_do(*option);
                Ok(())
            }
            TelnetEvent::Will(option) => {
                self.handle_will(*option);
                Ok(())
            }
            TelnetEvent::Dont(option) | TelnetEvent::Wont(option) => {
                debug!("host disabled option {}", TelnetOption::name(*option));
                Ok(())
            }
            TelnetEvent::Subnegotiation(data) => self.handle_subnegotiation(data),
            TelnetEvent::Record(_) => Ok(()),
        }
    }

    fn handle_do(&mut self, option: u8) {
        info!("DO {} ({})", option, TelnetOption::name(option));
        match TelnetOption::from_u8(option) {
            Some(TelnetOption::TerminalType) | Some(TelnetOption::EndOfRecord) => {
                self.send(TelnetCommand::WILL, option);
            }
            Some(TelnetOption::Binary) => {
                self.send(TelnetCommand::WILL, option);
                self.binary_mode = true;
            }
            Some(TelnetOption::TN3270E) => {
                self.send(TelnetCommand::WILL, option);
                self.tn3270e_mode = true;
                info!("accepting TN3270E mode");
            }
            _ => self.send(TelnetCommand::WONT, option),
        }
    }

    fn handle_will(&mut self, option: u8) {
        debug!("WILL {} ({})", option, TelnetOption::name(option));
        match TelnetOption::from_u8(option) {
            Some(TelnetOption::EndOfRecord) => self.send(TelnetCommand::DO, option),
            Some(TelnetOption::Binary) => {
                self.send(TelnetCommand::DO, option);
                self.binary_mode = true;
            }
            _ => self.send(TelnetCommand::DONT, option),
        }
    }

    fn handle_subnegotiation(&mut self, data: &[u8]) -> Result<(), NegotiationError> {
        let Some((&option, rest)) = data.split_first() else {
            return Ok(());
        };
        match TelnetOption::from_u8(option) {
            Some(TelnetOption::TerminalType) => {
                if rest.first() == Some(&TTYPE_SEND) {
                    let mut reply = vec![TTYPE_IS];
                    reply.extend_from_slice(self.terminal_type.as_bytes());
                    self.send_subnegotiation(TelnetOption::TerminalType as u8, &reply);
                    info!("sent terminal type {}", self.terminal_type);
                }
                Ok(())
            }
            Some(TelnetOption::TN3270E) => self.handle_tn3270e(rest),
            _ => {
                debug!("ignoring subnegotiation for option {option}");
                Ok(())
            }
        }
    }

    fn handle_tn3270e(&mut self, data: &[u8]) -> Result<(), NegotiationError> {
        let Some(&command) = data.first() else {
            return Ok(());
        };
        match command {
            TN3270E_SEND => {
                if data.get(1) == Some(&TN3270E_DEVICE_TYPE) {
                    self.send_device_type_request();
                }
                Ok(())
            }
            TN3270E_DEVICE_TYPE => match data.get(1) {
                Some(&TN3270E_IS) => {
                    self.handle_device_type_is(&data[2..]);
                    Ok(())
                }
                Some(&TN3270E_REJECT) => {
                    let reason = data.get(2).copied().unwrap_or(0);
                    if self.requested_lu.take().is_some() {
                        info!("device-type rejected (0x{reason:02X}), retrying without LU name");
                        self.send_device_type_request();
                        Ok(())
                    } else {
                        warn!("device-type rejected (0x{reason:02X}), no fallback left");
                        Err(NegotiationError::Rejected { reason })
                    }
                }
                _ => Ok(()),
            },
            TN3270E_FUNCTIONS => match data.get(1) {
                Some(&TN3270E_IS) => {
                    info!("TN3270E functions negotiation complete");
                    self.tn3270e_negotiated = true;
                    Ok(())
                }
                Some(&TN3270E_REQUEST) => {
                    // Host volunteered a function list. We support none, so
                    // counter a non-empty list and accept an empty one.
                    if data.len() > 2 {
                        self.send_subnegotiation(
                            TelnetOption::TN3270E as u8,
                            &[TN3270E_FUNCTIONS, TN3270E_REQUEST],
                        );
                    } else {
                        self.send_subnegotiation(
                            TelnetOption::TN3270E as u8,
                            &[TN3270E_FUNCTIONS, TN3270E_IS],
                        );
                        self.tn3270e_negotiated = true;
                    }
                    Ok(())
                }
                _ => Ok(()),
            },
            other => {
                debug!("unhandled TN3270E subcommand 0x{other:02X}");
                Ok(())
            }
        }
    }

    /// DEVICE-TYPE REQUEST <terminal type> CONNECT [<lu name>]
    fn send_device_type_request(&mut self) {
        let mut payload = vec![TN3270E_DEVICE_TYPE, TN3270E_REQUEST];
        payload.extend_from_slice(self.terminal_type.as_bytes());
        payload.push(TN3270E_CONNECT);
        if let Some(lu) = &self.requested_lu {
            payload.extend_from_slice(lu.as_bytes());
            info!("requesting device type {} with LU {}", self.terminal_type, lu);
        } else {
            info!("requesting device type {} (host assigns LU)", self.terminal_type);
        }
        self.send_subnegotiation(TelnetOption::TN3270E as u8, &payload);
    }

    /// DEVICE-TYPE IS <terminal type> [CONNECT <assigned lu>]
    fn handle_device_type_is(&mut self, rest: &[u8]) {
        if let Some(connect_pos) = rest.iter().position(|&b| b == TN3270E_CONNECT) {
            let lu: String = rest[connect_pos + 1..]
                .iter()
                .filter(|&&b| (0x20..0x7F).contains(&b))
                .map(|&b| b as char)
                .collect();
            if !lu.is_empty() {
                info!("host assigned LU {lu}");
                self.assigned_lu = Some(lu);
            }
        } else {
            debug!("device-type accepted without CONNECT response");
        }

        // Request no functions: plain 3270 data flow
        self.send_subnegotiation(
            TelnetOption::TN3270E as u8,
            &[TN3270E_FUNCTIONS, TN3270E_REQUEST],
        );
    }

    fn send(&mut self, command: TelnetCommand, option: u8) {
        self.output_buffer
            .extend_from_slice(&TelnetFramer::negotiation(command, option));
    }

    fn send_subnegotiation(&mut self, option: u8, data: &[u8]) {
        self.output_buffer
            .extend_from_slice(&TelnetFramer::subnegotiation(option, data));
    }
}
