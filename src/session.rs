//! TN3270 client session
//!
//! Single-threaded protocol engine tying the framer, negotiator and
//! data-stream processor to one transport. The collaborator drives it:
//! `connect` runs option negotiation to completion, `poll_screen` consumes
//! at most one inbound record, `send_aid` transmits an operator action.
//! Nothing here spawns threads or retains the transport across calls.

use std::time::Duration;

use log::{debug, info, warn};

use crate::codes::{AidKey, TN3270E_HEADER_LEN};
use crate::config::ConnectionConfig;
use crate::error::{TN3270Error, TN3270Result, TransportError};
use crate::network::{NetStream, Transport};
use crate::protocol::DataStreamProcessor;
use crate::screen::Screen;
use crate::telnet::{TelnetEvent, TelnetFramer};
use crate::telnet_negotiation::TelnetNegotiator;

/// A TN3270E terminal session
pub struct TN3270Session {
    config: ConnectionConfig,
    transport: Option<Box<dyn Transport>>,
    connected: bool,
    framer: TelnetFramer,
    negotiator: TelnetNegotiator,
    processor: DataStreamProcessor,
    screen: Screen,
}

impl TN3270Session {
    pub fn new(config: ConnectionConfig) -> Self {
        let negotiator = TelnetNegotiator::new(&config.terminal_type, config.lu_name.clone());
        Self {
            config,
            transport: None,
            connected: false,
            framer: TelnetFramer::new(),
            negotiator,
            processor: DataStreamProcessor::new(),
            screen: Screen::new(),
        }
    }

    /// Open the configured endpoint and run negotiation. Returns once
    /// TN3270E negotiation completes or, for hosts that never offer
    /// TN3270E, once the first screen record has been processed.
    pub fn connect(&mut self) -> TN3270Result<()> {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let stream = NetStream::connect(
            &self.config.host,
            self.config.port,
            self.config.tls,
            timeout,
        )?;
        self.connect_with_transport(Box::new(stream))
    }

    /// Run negotiation over a transport the collaborator established
    /// (for example an externally wrapped TLS stream).
    pub fn connect_with_transport(
        &mut self,
        mut transport: Box<dyn Transport>,
    ) -> TN3270Result<()> {
        transport
            .set_read_timeout(Some(Duration::from_secs(self.config.connect_timeout_secs)))
            .map_err(TransportError::from)?;

        self.framer.reset();
        self.negotiator.reset(self.config.lu_name.clone());
        self.screen = Screen::new();
        self.transport = Some(transport);
        self.connected = true;

        match self.run_negotiation() {
            Ok(()) => {
                if let Some(t) = self.transport.as_mut() {
                    t.set_read_timeout(Some(Duration::from_millis(self.config.poll_timeout_ms)))
                        .map_err(TransportError::from)?;
                }
                info!(
                    "session established (tn3270e={}, lu={:?})",
                    self.negotiator.tn3270e_negotiated(),
                    self.negotiator.assigned_lu()
                );
                Ok(())
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    fn run_negotiation(&mut self) -> TN3270Result<()> {
        let mut buf = [0u8; 4096];
        let mut got_record = false;

        loop {
            // Stop consuming the moment the session is ready so that
            // records queued behind the handshake stay buffered for
            // poll_screen.
            while !self.negotiator.tn3270e_negotiated() && !got_record {
                let Some(event) = self.framer.next_event() else {
                    break;
                };
                match event {
                    TelnetEvent::Record(record) => {
                        self.handle_record(&record)?;
                        got_record = true;
                    }
                    control => self.negotiator.handle_event(&control)?,
                }
            }
            self.flush_negotiator()?;

            if self.negotiator.tn3270e_negotiated() || got_record {
                return Ok(());
            }

            let transport = self.transport.as_mut().ok_or(TN3270Error::NotConnected)?;
            match transport.read(&mut buf) {
                Ok(0) => return Err(TransportError::ConnectionClosed.into()),
                Ok(n) => {
                    debug!("negotiation: received {n} bytes");
                    self.framer.feed(&buf[..n]);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(TransportError::Timeout {
                        host: self.config.host.clone(),
                        port: self.config.port,
                        timeout_seconds: self.config.connect_timeout_secs,
                    }
                    .into());
                }
                Err(e) => return Err(TransportError::from(e).into()),
            }
        }
    }

    /// Close the transport and clear buffered state. Safe to call twice.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!("disconnected from {}:{}", self.config.host, self.config.port);
        }
        self.connected = false;
        self.framer.reset();
    }

    /// Consume at most one complete inbound record. Returns the updated
    /// screen snapshot when a record was processed, `None` when no complete
    /// record is available yet. Control events encountered on the way are
    /// answered as a side effect.
    pub fn poll_screen(&mut self) -> TN3270Result<Option<Screen>> {
        if !self.connected {
            return Err(TN3270Error::NotConnected);
        }

        if let Some(snapshot) = self.drain_until_record()? {
            return Ok(Some(snapshot));
        }

        let mut buf = [0u8; 4096];
        let transport = self.transport.as_mut().ok_or(TN3270Error::NotConnected)?;
        match transport.read(&mut buf) {
            Ok(0) => {
                self.disconnect();
                return Err(TransportError::ConnectionClosed.into());
            }
            Ok(n) => self.framer.feed(&buf[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(None);
            }
            Err(e) => {
                self.disconnect();
                return Err(TransportError::from(e).into());
            }
        }

        self.drain_until_record()
    }

    fn drain_until_record(&mut self) -> TN3270Result<Option<Screen>> {
        while let Some(event) = self.framer.next_event() {
            match event {
                TelnetEvent::Record(record) => {
                    self.handle_record(&record)?;
                    return Ok(Some(self.screen.clone()));
                }
                control => {
                    self.negotiator.handle_event(&control)?;
                    self.flush_negotiator()?;
                }
            }
        }
        Ok(None)
    }

    fn handle_record(&mut self, record: &[u8]) -> TN3270Result<()> {
        debug!("processing record of {} bytes", record.len());
        let tn3270e = self.negotiator.tn3270e_mode();
        if let Some(response) = self
            .processor
            .process_record(record, &mut self.screen, tn3270e)
        {
            self.transmit(&response)?;
        }
        Ok(())
    }

    /// Transmit an AID key press together with the modified fields the UI
    /// lists as `(first data cell address, content)`. Short Read AIDs send
    /// neither cursor nor data. Afterwards every client-side MDT is cleared
    /// so the next transmission carries only fresh modifications.
    pub fn send_aid(&mut self, aid: AidKey, modified_fields: &[(u16, String)]) -> TN3270Result<()> {
        if !self.connected {
            return Err(TN3270Error::NotConnected);
        }
        let payload = self
            .processor
            .build_aid_record(&self.screen, aid, modified_fields);
        self.transmit(&payload)?;
        if !aid.is_short_read() {
            self.screen.reset_modified();
        }
        debug!(
            "sent AID {:?} with {} modified fields",
            aid,
            modified_fields.len()
        );
        Ok(())
    }

    /// ENTER with optional input into the field whose data starts at
    /// `field_address`
    pub fn send_enter(&mut self, input: &str, field_address: u16) -> TN3270Result<()> {
        let fields = if input.is_empty() {
            Vec::new()
        } else {
            vec![(field_address, input.to_string())]
        };
        self.send_aid(AidKey::Enter, &fields)
    }

    /// PF key (1-24)
    pub fn send_pf(&mut self, n: u8) -> TN3270Result<()> {
        match AidKey::pf(n) {
            Some(aid) => self.send_aid(aid, &[]),
            None => {
                warn!("ignoring out-of-range PF key {n}");
                Ok(())
            }
        }
    }

    /// PA key (1-3)
    pub fn send_pa(&mut self, n: u8) -> TN3270Result<()> {
        match AidKey::pa(n) {
            Some(aid) => self.send_aid(aid, &[]),
            None => {
                warn!("ignoring out-of-range PA key {n}");
                Ok(())
            }
        }
    }

    /// CLEAR key (Short Read)
    pub fn send_clear(&mut self) -> TN3270Result<()> {
        self.send_aid(AidKey::Clear, &[])
    }

    /// Prepend the TN3270E header when negotiated, frame, and write
    fn transmit(&mut self, payload: &[u8]) -> TN3270Result<()> {
        let mut message = Vec::with_capacity(payload.len() + TN3270E_HEADER_LEN + 2);
        if self.negotiator.tn3270e_mode() {
            // data-type 3270-DATA, no flags, sequence zero
            message.extend_from_slice(&[0u8; TN3270E_HEADER_LEN]);
        }
        message.extend_from_slice(payload);
        let framed = TelnetFramer::frame_record(&message);
        self.write_all(&framed)
    }

    fn flush_negotiator(&mut self) -> TN3270Result<()> {
        let out = self.negotiator.take_output();
        if out.is_empty() {
            return Ok(());
        }
        self.write_all(&out)
    }

    fn write_all(&mut self, bytes: &[u8]) -> TN3270Result<()> {
        let transport = self.transport.as_mut().ok_or(TN3270Error::NotConnected)?;
        transport.write_all(bytes).map_err(TransportError::from)?;
        transport.flush().map_err(TransportError::from)?;
        Ok(())
    }

    /// Current screen; the borrow stays valid until the next `poll_screen`
    /// or `send_aid`
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Mutable screen access for operator input (`write_char` flags the
    /// containing field modified)
    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// LU name the host assigned during TN3270E negotiation
    pub fn assigned_lu(&self) -> Option<&str> {
        self.negotiator.assigned_lu()
    }

    pub fn tn3270e_mode(&self) -> bool {
        self.negotiator.tn3270e_mode()
    }

    pub fn binary_mode(&self) -> bool {
        self.negotiator.binary_mode()
    }

    /// Malformed sub-structures dropped so far (never raised as errors)
    pub fn malformed_records(&self) -> u64 {
        self.processor.malformed_records()
    }

    /// Unknown command bytes handled via the Write fallback
    pub fn unknown_commands(&self) -> u64 {
        self.processor.unknown_commands()
    }
}

impl std::fmt::Debug for TN3270Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TN3270Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.connected)
            .field("tn3270e", &self.negotiator.tn3270e_negotiated())
            .finish()
    }
}
