//! Telnet framing for the 3270 data stream
//!
//! 3270 records ride inside a telnet connection: option negotiation uses IAC
//! command sequences, record boundaries are marked by `IAC EOR`, and a 0xFF
//! byte inside a record is escaped as `IAC IAC`. The framer here is
//! streaming: bytes are fed in as they arrive, complete constructs come out
//! as events, and incomplete trailing constructs stay buffered until the
//! next read completes them.

use log::{debug, warn};

/// Telnet command codes (RFC 854 plus EOR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelnetCommand {
    /// End of Record - 239 (0xEF)
    EOR = 239,
    /// Subnegotiation End - 240 (0xF0)
    SE = 240,
    /// Subnegotiation Begin - 250 (0xFA)
    SB = 250,
    /// Will - 251 (0xFB)
    WILL = 251,
    /// Won't - 252 (0xFC)
    WONT = 252,
    /// Do - 253 (0xFD)
    DO = 253,
    /// Don't - 254 (0xFE)
    DONT = 254,
    /// Interpret As Command - 255 (0xFF)
    IAC = 255,
}

impl TelnetCommand {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            239 => Some(TelnetCommand::EOR),
            240 => Some(TelnetCommand::SE),
            250 => Some(TelnetCommand::SB),
            251 => Some(TelnetCommand::WILL),
            252 => Some(TelnetCommand::WONT),
            253 => Some(TelnetCommand::DO),
            254 => Some(TelnetCommand::DONT),
            255 => Some(TelnetCommand::IAC),
            _ => None,
        }
    }
}

/// Telnet options this client recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelnetOption {
    /// Binary Transmission - 0
    Binary = 0,
    /// Echo - 1
    Echo = 1,
    /// Terminal Type - 24
    TerminalType = 24,
    /// End of Record - 25
    EndOfRecord = 25,
    /// TN3270 Enhanced - 40
    TN3270E = 40,
}

impl TelnetOption {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TelnetOption::Binary),
            1 => Some(TelnetOption::Echo),
            24 => Some(TelnetOption::TerminalType),
            25 => Some(TelnetOption::EndOfRecord),
            40 => Some(TelnetOption::TN3270E),
            _ => None,
        }
    }

    pub fn name(option: u8) -> &'static str {
        match Self::from_u8(option) {
            Some(TelnetOption::Binary) => "BINARY",
            Some(TelnetOption::Echo) => "ECHO",
            Some(TelnetOption::TerminalType) => "TERMINAL-TYPE",
            Some(TelnetOption::EndOfRecord) => "EOR",
            Some(TelnetOption::TN3270E) => "TN3270E",
            None => "unknown",
        }
    }
}

const IAC: u8 = TelnetCommand::IAC as u8;
const SE: u8 = TelnetCommand::SE as u8;
const SB: u8 = TelnetCommand::SB as u8;
const EOR: u8 = TelnetCommand::EOR as u8;

/// One complete construct extracted from the telnet stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// A 3270 payload terminated by IAC EOR, escapes removed
    Record(Vec<u8>),
    /// IAC DO option
    Do(u8),
    /// IAC DONT option
    Dont(u8),
    /// IAC WILL option
    Will(u8),
    /// IAC WONT option
    Wont(u8),
    /// IAC SB option ... IAC SE, option byte first, escapes removed
    Subnegotiation(Vec<u8>),
}

/// Streaming extractor over the raw receive buffer
#[derive(Debug, Default)]
pub struct TelnetFramer {
    /// Raw bytes not yet parsed into a complete construct
    buffer: Vec<u8>,
    /// Unescaped payload of the record in progress
    record: Vec<u8>,
}

impl TelnetFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read transport bytes
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes currently held (raw plus partial record)
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.record.len()
    }

    /// Drop all buffered state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.record.clear();
    }

    /// Extract the next complete construct, consuming its bytes. Payload
    /// bytes that do not yet end in IAC EOR accumulate internally and are
    /// not returned until the record completes.
    pub fn next_event(&mut self) -> Option<TelnetEvent> {
        let mut pos = 0;
        let mut event = None;

        'scan: while pos < self.buffer.len() {
            if self.buffer[pos] != IAC {
                self.record.push(self.buffer[pos]);
                pos += 1;
                continue;
            }
            // IAC at pos; everything below needs at least one more byte
            if pos + 1 >= self.buffer.len() {
                break;
            }
            match self.buffer[pos + 1] {
                IAC => {
                    // escaped data byte
                    self.record.push(0xFF);
                    pos += 2;
                }
                EOR => {
                    debug!("EOR: record of {} bytes complete", self.record.len());
                    event = Some(TelnetEvent::Record(std::mem::take(&mut self.record)));
                    pos += 2;
                    break;
                }
                cmd @ (251..=254) => {
                    if pos + 2 >= self.buffer.len() {
                        break;
                    }
                    let option = self.buffer[pos + 2];
                    event = Some(match cmd {
                        251 => TelnetEvent::Will(option),
                        252 => TelnetEvent::Wont(option),
                        253 => TelnetEvent::Do(option),
                        _ => TelnetEvent::Dont(option),
                    });
                    pos += 3;
                    break;
                }
                SB => {
                    let mut sub = Vec::new();
                    let mut j = pos + 2;
                    loop {
                        if j >= self.buffer.len() {
                            // subnegotiation not yet terminated
                            break 'scan;
                        }
                        if self.buffer[j] == IAC {
                            if j + 1 >= self.buffer.len() {
                                break 'scan;
                            }
                            match self.buffer[j + 1] {
                                SE => {
                                    event = Some(TelnetEvent::Subnegotiation(sub));
                                    pos = j + 2;
                                    break 'scan;
                                }
                                IAC => {
                                    sub.push(0xFF);
                                    j += 2;
                                }
                                _ => {
                                    sub.push(self.buffer[j]);
                                    j += 1;
                                }
                            }
                        } else {
                            sub.push(self.buffer[j]);
                            j += 1;
                        }
                    }
                }
                other => {
                    // NOP, GA and friends carry no operand for our purposes
                    warn!("ignoring telnet command 0x{other:02X}");
                    pos += 2;
                }
            }
        }

        self.buffer.drain(..pos);
        event
    }

    /// Escape every 0xFF byte in an outbound payload
    pub fn escape_iac(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        for &byte in data {
            out.push(byte);
            if byte == IAC {
                out.push(IAC);
            }
        }
        out
    }

    /// Frame an outbound 3270 message: escape IACs and terminate with IAC EOR
    pub fn frame_record(payload: &[u8]) -> Vec<u8> {
        let mut out = Self::escape_iac(payload);
        out.push(IAC);
        out.push(EOR);
        out
    }

    /// Build an IAC command triple such as `IAC WILL option`
    pub fn negotiation(command: TelnetCommand, option: u8) -> Vec<u8> {
        vec![IAC, command as u8, option]
    }

    /// Build `IAC SB option data IAC SE`, escaping IACs inside the data
    pub fn subnegotiation(option: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![IAC, SB, option];
        out.extend_from_slice(&Self::escape_iac(data));
        out.push(IAC);
        out.push(SE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(framer: &mut TelnetFramer) -> Vec<TelnetEvent> {
        let mut events = Vec::new();
        while let Some(ev) = framer.next_event() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn test_record_extraction() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[0x01, 0x02, 0x03, IAC, EOR]);
        assert_eq!(
            drain(&mut framer),
            vec![TelnetEvent::Record(vec![0x01, 0x02, 0x03])]
        );
    }

    #[test]
    fn test_escaped_iac_in_record() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[0x01, IAC, IAC, 0x02, IAC, EOR]);
        assert_eq!(
            drain(&mut framer),
            vec![TelnetEvent::Record(vec![0x01, 0xFF, 0x02])]
        );
    }

    #[test]
    fn test_negotiation_events() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[IAC, 253, 24, IAC, 251, 25, IAC, 254, 1, IAC, 252, 0]);
        assert_eq!(
            drain(&mut framer),
            vec![
                TelnetEvent::Do(24),
                TelnetEvent::Will(25),
                TelnetEvent::Dont(1),
                TelnetEvent::Wont(0),
            ]
        );
    }

    #[test]
    fn test_subnegotiation() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[IAC, SB, 24, 1, IAC, SE]);
        assert_eq!(
            drain(&mut framer),
            vec![TelnetEvent::Subnegotiation(vec![24, 1])]
        );
    }

    #[test]
    fn test_subnegotiation_with_escaped_iac() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[IAC, SB, 40, IAC, IAC, 0x02, IAC, SE]);
        assert_eq!(
            drain(&mut framer),
            vec![TelnetEvent::Subnegotiation(vec![40, 0xFF, 0x02])]
        );
    }

    #[test]
    fn test_partial_record_retained() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[0x01, 0x02]);
        assert_eq!(framer.next_event(), None);
        framer.feed(&[0x03, IAC]);
        assert_eq!(framer.next_event(), None);
        framer.feed(&[EOR]);
        assert_eq!(
            framer.next_event(),
            Some(TelnetEvent::Record(vec![0x01, 0x02, 0x03]))
        );
    }

    #[test]
    fn test_partial_subnegotiation_retained() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[IAC, SB, 40, 0x08]);
        assert_eq!(framer.next_event(), None);
        framer.feed(&[0x02, IAC, SE]);
        assert_eq!(
            framer.next_event(),
            Some(TelnetEvent::Subnegotiation(vec![40, 0x08, 0x02]))
        );
    }

    #[test]
    fn test_control_interleaved_with_record() {
        // EOR timing marks can arrive between negotiation triples
        let mut framer = TelnetFramer::new();
        framer.feed(&[0x01, IAC, 253, 0, 0x02, IAC, EOR]);
        assert_eq!(framer.next_event(), Some(TelnetEvent::Do(0)));
        assert_eq!(
            framer.next_event(),
            Some(TelnetEvent::Record(vec![0x01, 0x02]))
        );
    }

    #[test]
    fn test_frame_record_round_trip() {
        let payload = vec![0x7D, 0xFF, 0x11, 0x40, 0xFF, 0xFF, 0x00];
        let framed = TelnetFramer::frame_record(&payload);
        let mut framer = TelnetFramer::new();
        framer.feed(&framed);
        assert_eq!(framer.next_event(), Some(TelnetEvent::Record(payload)));
        assert_eq!(framer.next_event(), None);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_reset() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[0x01, 0x02]);
        framer.next_event();
        framer.reset();
        assert_eq!(framer.pending_len(), 0);
        framer.feed(&[IAC, EOR]);
        // previous partial bytes must not leak into the new record
        assert_eq!(framer.next_event(), Some(TelnetEvent::Record(vec![])));
    }

    #[test]
    fn test_multiple_records() {
        let mut framer = TelnetFramer::new();
        framer.feed(&[0x01, IAC, EOR, 0x02, IAC, EOR]);
        assert_eq!(framer.next_event(), Some(TelnetEvent::Record(vec![0x01])));
        assert_eq!(framer.next_event(), Some(TelnetEvent::Record(vec![0x02])));
        assert_eq!(framer.next_event(), None);
    }
}
