//! 3270 data-stream processing
//!
//! Inbound: a record (already stripped of telnet framing) starts with a
//! command byte, optionally preceded by the 5-byte TN3270E header. Write
//! commands carry a WCC and a run of orders and characters that mutate the
//! screen buffer. Write Structured Field carries length-prefixed blocks, of
//! which Read Partition (Query) demands an answer.
//!
//! Outbound: an AID transmission is the AID byte, the encoded cursor
//! address, and each modified field as `SBA address contents`, unless the
//! AID is a Short Read.
//!
//! Malformed sub-structures are dropped, never fatal; they and unknown
//! command bytes are tallied in counters the collaborator can read.

use log::{debug, info};

use crate::addressing::{decode_buffer_address, encode_buffer_address};
use crate::codes::*;
use crate::ebcdic::{ebcdic_to_display, string_to_ebcdic};
use crate::screen::Screen;

/// 3270 data-stream processor
#[derive(Debug, Default)]
pub struct DataStreamProcessor {
    /// Truncated or inconsistent sub-structures dropped so far
    malformed_records: u64,
    /// Unrecognized command bytes handled via the Write fallback
    unknown_commands: u64,
}

impl DataStreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn malformed_records(&self) -> u64 {
        self.malformed_records
    }

    pub fn unknown_commands(&self) -> u64 {
        self.unknown_commands
    }

    /// Process one complete inbound record, mutating the screen. Returns an
    /// outbound payload when the record demands an answer (Query Reply).
    ///
    /// `tn3270e` selects stripping of the 5-byte TN3270E header, present
    /// when the first byte is 0x00 (3270-DATA).
    pub fn process_record(
        &mut self,
        record: &[u8],
        screen: &mut Screen,
        tn3270e: bool,
    ) -> Option<Vec<u8>> {
        let data = if tn3270e
            && record.len() >= TN3270E_HEADER_LEN
            && record[0] == TN3270E_DATA_3270
        {
            &record[TN3270E_HEADER_LEN..]
        } else {
            record
        };

        let Some(&cmd_byte) = data.first() else {
            return None;
        };

        match CommandCode::from_u8(cmd_byte) {
            Some(cmd @ (CommandCode::Write | CommandCode::EraseWrite | CommandCode::EraseWriteAlternate)) => {
                debug!("{cmd:?} command, {} bytes", data.len());
                self.process_write(&data[1..], cmd.erases(), screen);
                None
            }
            Some(CommandCode::WriteStructuredField) => {
                debug!("Write Structured Field command, {} bytes", data.len());
                self.process_structured_fields(&data[1..], screen)
            }
            Some(CommandCode::ReadModified) => {
                // Answered when the operator presses an AID key
                debug!("Read Modified command - no screen change");
                None
            }
            Some(CommandCode::ReadBuffer) => {
                debug!("Read Buffer command - no screen change");
                None
            }
            None => {
                // Best-effort fallback: skip the unknown byte and apply the
                // remainder as write data without a WCC.
                info!("unknown command 0x{cmd_byte:02X}, applying write fallback");
                self.unknown_commands += 1;
                self.interpret_orders(&data[1..], screen);
                None
            }
        }
    }

    /// Write / Erase-Write / Erase-Write-Alternate: optional erase, WCC,
    /// then orders and data
    fn process_write(&mut self, data: &[u8], erase: bool, screen: &mut Screen) {
        screen.lock_keyboard();
        if erase {
            screen.clear();
        }

        let Some((&wcc, orders)) = data.split_first() else {
            return;
        };
        if wcc & (WCC_RESET | WCC_RESET_MDT) != 0 {
            screen.reset_modified();
        }
        if wcc & WCC_ALARM != 0 {
            screen.set_alarm();
        }
        if wcc & WCC_RESTORE != 0 {
            screen.unlock_keyboard();
        }

        self.interpret_orders(orders, screen);
    }

    /// Apply a run of orders and characters to the screen. The write
    /// position starts at the cursor and the cursor lands on the final
    /// write position. Truncated operands stop processing quietly.
    fn interpret_orders(&mut self, data: &[u8], screen: &mut Screen) {
        let size = screen.buffer_size();
        let mut pos = screen.cursor_address();
        let mut i = 0;

        while i < data.len() {
            match data[i] {
                ORDER_SBA => {
                    if i + 2 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    pos = decode_buffer_address(data[i + 1], data[i + 2], size);
                    i += 3;
                }
                ORDER_SF => {
                    if i + 1 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    screen.insert_field(pos, data[i + 1]);
                    pos = (pos + 1) % size;
                    i += 2;
                }
                ORDER_SFE => {
                    let Some(attr) = self.parse_sfe(&data[i..]) else {
                        break;
                    };
                    let count = data[i + 1] as usize;
                    screen.insert_field(pos, attr);
                    pos = (pos + 1) % size;
                    i += 2 + count * 2;
                }
                ORDER_SA => {
                    // extended highlighting is not modeled
                    if i + 2 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    i += 3;
                }
                ORDER_MF => {
                    if i + 1 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    let count = data[i + 1] as usize;
                    if i + 2 + count * 2 > data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    i += 2 + count * 2;
                }
                ORDER_IC => {
                    screen.set_cursor(pos);
                    debug!("IC order: cursor at {pos}");
                    i += 1;
                }
                ORDER_PT => {
                    // practical screens position with SBA instead
                    i += 1;
                }
                ORDER_RA => {
                    if i + 3 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    let target = decode_buffer_address(data[i + 1], data[i + 2], size);
                    let ch = ebcdic_to_display(data[i + 3]);
                    while pos != target {
                        screen.set_char(pos, ch);
                        pos = (pos + 1) % size;
                    }
                    i += 4;
                }
                ORDER_EUA => {
                    if i + 2 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    let target = decode_buffer_address(data[i + 1], data[i + 2], size);
                    while pos != target {
                        if !screen.is_attribute_cell(pos) && !screen.is_protected(pos) {
                            screen.set_char(pos, ' ');
                        }
                        pos = (pos + 1) % size;
                    }
                    i += 3;
                }
                ORDER_GE => {
                    if i + 1 >= data.len() {
                        self.malformed_records += 1;
                        break;
                    }
                    screen.set_char(pos, ebcdic_to_display(data[i + 1]));
                    pos = (pos + 1) % size;
                    i += 2;
                }
                byte => {
                    screen.set_char(pos, ebcdic_to_display(byte));
                    pos = (pos + 1) % size;
                    i += 1;
                }
            }
        }

        screen.set_cursor(pos);
    }

    /// Derive the basic attribute from an SFE order starting at `data[0]`.
    /// Returns None (and counts) when the pair list is truncated.
    fn parse_sfe(&mut self, data: &[u8]) -> Option<u8> {
        if data.len() < 2 {
            self.malformed_records += 1;
            return None;
        }
        let count = data[1] as usize;
        if 2 + count * 2 > data.len() {
            self.malformed_records += 1;
            return None;
        }
        let mut attr = 0x00;
        for p in 0..count {
            let attr_type = data[2 + p * 2];
            let attr_value = data[3 + p * 2];
            if attr_type == XA_3270 {
                attr = attr_value;
            }
        }
        Some(attr)
    }

    /// Walk length-prefixed structured fields; answer Read Partition Query
    fn process_structured_fields(
        &mut self,
        data: &[u8],
        screen: &mut Screen,
    ) -> Option<Vec<u8>> {
        let mut response = None;
        let mut i = 0;

        while i + 2 <= data.len() {
            let length = u16::from_be_bytes([data[i], data[i + 1]]) as usize;
            if length < 3 || i + length > data.len() {
                self.malformed_records += 1;
                break;
            }
            let sf_id = data[i + 2];
            debug!("structured field 0x{sf_id:02X}, length {length}");

            if sf_id == SF_READ_PARTITION && length >= 5 {
                let partition_id = data[i + 3];
                let op_type = data[i + 4];
                info!("Read Partition: pid={partition_id}, op=0x{op_type:02X}");
                if op_type == READ_PARTITION_QUERY || op_type == READ_PARTITION_QUERY_LIST {
                    response = Some(self.build_query_reply(screen));
                }
            }

            i += length;
        }

        response
    }

    /// Query Reply: AID 0x88 followed by Usable Area and Summary replies
    fn build_query_reply(&self, screen: &Screen) -> Vec<u8> {
        let mut reply = vec![AID_STRUCTURED_FIELD];
        reply.extend_from_slice(&Self::query_reply_usable_area(screen));
        reply.extend_from_slice(&Self::query_reply_summary());
        info!("built Query Reply ({} bytes)", reply.len());
        reply
    }

    fn query_reply_usable_area(screen: &Screen) -> Vec<u8> {
        let mut qr = vec![
            0x00, 0x00, // length, filled below
            QR_PREFIX,
            QR_USABLE_AREA,
            0x01, // flags: 12/14-bit addressing
            0x00, // flags2
        ];
        qr.extend_from_slice(&(screen.cols() as u16).to_be_bytes());
        qr.extend_from_slice(&(screen.rows() as u16).to_be_bytes());
        qr.push(0x00); // units: inches
        qr.extend_from_slice(&[0x00; 4]); // Xr numerator/denominator
        qr.extend_from_slice(&[0x00; 4]); // Yr numerator/denominator
        qr.push(0x09); // AW: character cell width
        qr.push(0x0C); // AH: character cell height
        qr.extend_from_slice(&screen.buffer_size().to_be_bytes());

        let length = qr.len() as u16;
        qr[0..2].copy_from_slice(&length.to_be_bytes());
        qr
    }

    fn query_reply_summary() -> Vec<u8> {
        let mut qr = vec![
            0x00, 0x00,
            QR_PREFIX,
            QR_SUMMARY,
            QR_USABLE_AREA,
            QR_HIGHLIGHTING,
            QR_REPLY_MODES,
        ];
        let length = qr.len() as u16;
        qr[0..2].copy_from_slice(&length.to_be_bytes());
        qr
    }

    /// Build the outbound payload for an AID key press.
    ///
    /// `modified_fields` pairs a field's first data cell with the content to
    /// transmit verbatim. Fields whose MDT the host set and which the UI did
    /// not mention are promoted from their current cell contents. Short Read
    /// AIDs transmit the AID byte alone.
    pub fn build_aid_record(
        &self,
        screen: &Screen,
        aid: AidKey,
        modified_fields: &[(u16, String)],
    ) -> Vec<u8> {
        let mut out = vec![aid.to_u8()];
        if aid.is_short_read() {
            return out;
        }

        out.extend_from_slice(&encode_buffer_address(screen.cursor_address()));

        for (address, content) in modified_fields {
            out.push(ORDER_SBA);
            out.extend_from_slice(&encode_buffer_address(*address));
            out.extend_from_slice(&string_to_ebcdic(content));
        }

        let size = screen.buffer_size();
        for field in screen.fields().iter().filter(|f| f.modified) {
            let data_start = field.data_start(size);
            if modified_fields.iter().any(|(a, _)| *a == data_start) {
                continue;
            }
            let content = screen.field_text(field);
            if content.is_empty() {
                continue;
            }
            debug!("promoting MDT field at {} ({} chars)", field.address, content.len());
            out.push(ORDER_SBA);
            out.extend_from_slice(&encode_buffer_address(data_start));
            out.extend_from_slice(&string_to_ebcdic(&content));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDisplay;

    fn processed(data: &[u8]) -> (Screen, DataStreamProcessor) {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        processor.process_record(data, &mut screen, false);
        (screen, processor)
    }

    #[test]
    fn test_erase_write_with_text() {
        // EW, WCC, SBA(0), "HELLO"
        let (screen, _) = processed(&[
            0x05, 0xC3, 0x11, 0x40, 0x40, 0xC8, 0xC5, 0xD3, 0xD3, 0xD6,
        ]);
        assert_eq!(screen.string_at(0, 0, 5), "HELLO");
        assert_eq!(screen.cursor_address(), 5);
        assert!(screen.fields().is_empty());
    }

    #[test]
    fn test_sna_command_form() {
        let (screen, _) = processed(&[
            0xF5, 0xC3, 0x11, 0x40, 0x40, 0xC8, 0xC5, 0xD3, 0xD3, 0xD6,
        ]);
        assert_eq!(screen.string_at(0, 0, 5), "HELLO");
    }

    #[test]
    fn test_start_field() {
        // EW, WCC, SBA(0), SF(0xE0: protected), "AB"
        let (screen, _) = processed(&[0x05, 0xC3, 0x11, 0x40, 0x40, 0x1D, 0xE0, 0xC1, 0xC2]);
        assert_eq!(screen.fields().len(), 1);
        let field = &screen.fields()[0];
        assert_eq!(field.address, 0);
        assert!(field.protected);
        assert_eq!(screen.char_at(0), ' ');
        assert_eq!(screen.string_at(0, 1, 2), "AB");
        assert_eq!(screen.cursor_address(), 3);
    }

    #[test]
    fn test_start_field_non_display() {
        // attribute 0x0C: unprotected, display bits 11
        let (screen, _) = processed(&[0x05, 0xC3, 0x11, 0x40, 0x40, 0x1D, 0x0C]);
        let field = &screen.fields()[0];
        assert!(!field.protected);
        assert_eq!(field.display, FieldDisplay::NonDisplay);
        assert!(screen.is_password(1));
    }

    #[test]
    fn test_start_field_extended() {
        // SFE with 2 pairs; type 0xC0 carries the basic attribute
        let (screen, _) = processed(&[
            0x05, 0xC3, 0x11, 0x40, 0x40, 0x29, 0x02, 0x41, 0xF1, 0xC0, 0x20, 0xC1,
        ]);
        assert_eq!(screen.fields().len(), 1);
        assert!(screen.fields()[0].protected);
        assert_eq!(screen.char_at(1), 'A');
        assert_eq!(screen.cursor_address(), 2);
    }

    #[test]
    fn test_repeat_to_address() {
        // RA to address 4 with EBCDIC '*'
        let (screen, _) = processed(&[0x05, 0xC3, 0x11, 0x40, 0x40, 0x3C, 0x40, 0xC4, 0x5C]);
        assert_eq!(screen.string_at(0, 0, 4), "****");
        assert_eq!(screen.char_at(4), ' ');
        assert_eq!(screen.cursor_address(), 4);
    }

    #[test]
    fn test_repeat_wraps_around() {
        // position at 1918 via SBA, repeat to 2
        let [b1, b2] = encode_buffer_address(1918);
        let [t1, t2] = encode_buffer_address(2);
        let (screen, _) = processed(&[0x05, 0xC3, 0x11, b1, b2, 0x3C, t1, t2, 0x5C]);
        assert_eq!(screen.char_at(1918), '*');
        assert_eq!(screen.char_at(1919), '*');
        assert_eq!(screen.char_at(0), '*');
        assert_eq!(screen.char_at(1), '*');
        assert_eq!(screen.char_at(2), ' ');
        assert_eq!(screen.cursor_address(), 2);
    }

    #[test]
    fn test_erase_unprotected_to_address() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        // protected field at 0, unprotected at 10; text in both
        processor.process_record(
            &[
                0x05, 0xC3, // EW, WCC
                0x11, 0x40, 0x40, // SBA 0
                0x1D, 0x60, // SF protected
                0xC1, 0xC1, // "AA"
                0x11, 0x40, 0x4A, // SBA 10
                0x1D, 0x40, // SF unprotected
                0xC2, 0xC2, // "BB"
            ],
            &mut screen,
            false,
        );
        let [e1, e2] = encode_buffer_address(20);
        processor.process_record(
            &[0x01, 0x00, 0x11, 0x40, 0x40, 0x12, e1, e2],
            &mut screen,
            false,
        );
        // protected text stays, unprotected text blanked
        assert_eq!(screen.char_at(1), 'A');
        assert_eq!(screen.char_at(2), 'A');
        assert_eq!(screen.char_at(11), ' ');
        assert_eq!(screen.char_at(12), ' ');
        assert_eq!(screen.cursor_address(), 20);
    }

    #[test]
    fn test_insert_cursor() {
        // text, IC, more text: cursor tracks the final write position
        let (screen, _) = processed(&[0x05, 0xC3, 0x11, 0x40, 0x40, 0xC1, 0x13, 0xC2]);
        assert_eq!(screen.char_at(0), 'A');
        assert_eq!(screen.char_at(1), 'B');
        assert_eq!(screen.cursor_address(), 2);
    }

    #[test]
    fn test_graphic_escape() {
        let (screen, _) = processed(&[0x05, 0xC3, 0x11, 0x40, 0x40, 0x08, 0xC1]);
        assert_eq!(screen.char_at(0), 'A');
        assert_eq!(screen.cursor_address(), 1);
    }

    #[test]
    fn test_truncated_sba_stops_quietly() {
        let (screen, processor) = processed(&[0x05, 0xC3, 0xC1, 0x11, 0x40]);
        assert_eq!(screen.char_at(0), 'A');
        assert_eq!(processor.malformed_records(), 1);
    }

    #[test]
    fn test_unknown_command_fallback() {
        // unknown byte is skipped, remainder interpreted without a WCC
        let (screen, processor) = processed(&[0x99, 0x11, 0x40, 0x40, 0xC8, 0xC9]);
        assert_eq!(screen.string_at(0, 0, 2), "HI");
        assert_eq!(processor.unknown_commands(), 1);
    }

    #[test]
    fn test_wcc_restore_and_alarm() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        processor.process_record(&[0x05, 0x06], &mut screen, false);
        assert!(!screen.is_keyboard_locked());
        assert!(screen.take_alarm());

        processor.process_record(&[0x01, 0x00], &mut screen, false);
        assert!(screen.is_keyboard_locked());
    }

    #[test]
    fn test_wcc_reset_mdt() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        // SF carrying MDT
        processor.process_record(&[0x05, 0x00, 0x1D, 0x01], &mut screen, false);
        assert!(screen.fields()[0].modified);
        processor.process_record(&[0x01, 0x01], &mut screen, false);
        assert!(!screen.fields()[0].modified);
    }

    #[test]
    fn test_tn3270e_header_stripped() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        let record = [
            0x00, 0x00, 0x00, 0x00, 0x00, // TN3270E header
            0x05, 0xC3, 0x11, 0x40, 0x40, 0xC8, 0xC9,
        ];
        processor.process_record(&record, &mut screen, true);
        assert_eq!(screen.string_at(0, 0, 2), "HI");
    }

    #[test]
    fn test_query_reply() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        // WSF, Read Partition SF: length=5, id=0x01, pid=0xFF, op=Query
        let reply = processor
            .process_record(&[0x11, 0x00, 0x05, 0x01, 0xFF, 0x02], &mut screen, false)
            .expect("query demands a reply");

        assert_eq!(reply[0], AID_STRUCTURED_FIELD);
        // Usable Area: length 23, qcode 81 81, flags 01, 80x24, buffer 1920
        assert_eq!(&reply[1..3], &[0x00, 0x17]);
        assert_eq!(&reply[3..5], &[0x81, 0x81]);
        assert_eq!(reply[5], 0x01);
        assert_eq!(&reply[7..9], &[0x00, 0x50]);
        assert_eq!(&reply[9..11], &[0x00, 0x18]);
        assert_eq!(&reply[20..22], &[0x09, 0x0C]);
        assert_eq!(&reply[22..24], &[0x07, 0x80]);
        // Summary: length 7, qcode 81 80, then supported qcodes
        assert_eq!(&reply[24..31], &[0x00, 0x07, 0x81, 0x80, 0x81, 0x87, 0x88]);
        assert_eq!(reply.len(), 31);
    }

    #[test]
    fn test_query_list_also_answered() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        let reply =
            processor.process_record(&[0x11, 0x00, 0x05, 0x01, 0x00, 0xFF], &mut screen, false);
        assert!(reply.is_some());
    }

    #[test]
    fn test_other_structured_fields_skipped() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        // SF id 0x40 (unknown, skipped by length) then Read Partition Query
        let reply = processor.process_record(
            &[0x11, 0x00, 0x04, 0x40, 0x00, 0x00, 0x05, 0x01, 0x00, 0x02],
            &mut screen,
            false,
        );
        assert!(reply.is_some());
    }

    #[test]
    fn test_bad_structured_field_length() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        let reply = processor.process_record(&[0x11, 0x00, 0x01, 0x01], &mut screen, false);
        assert!(reply.is_none());
        assert_eq!(processor.malformed_records(), 1);
    }

    #[test]
    fn test_build_aid_enter_with_field() {
        let mut screen = Screen::new();
        screen.set_cursor(14);
        let processor = DataStreamProcessor::new();
        let out = processor.build_aid_record(
            &screen,
            AidKey::Enter,
            &[(11, "ABC".to_string())],
        );
        let mut expected = vec![AID_ENTER];
        expected.extend_from_slice(&encode_buffer_address(14));
        expected.push(ORDER_SBA);
        expected.extend_from_slice(&encode_buffer_address(11));
        expected.extend_from_slice(&[0xC1, 0xC2, 0xC3]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_build_aid_short_read() {
        let screen = Screen::new();
        let processor = DataStreamProcessor::new();
        assert_eq!(
            processor.build_aid_record(&screen, AidKey::Clear, &[]),
            vec![AID_CLEAR]
        );
        assert_eq!(
            processor.build_aid_record(&screen, AidKey::PA2, &[]),
            vec![AID_PA2]
        );
    }

    #[test]
    fn test_build_aid_promotes_host_mdt_fields() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        // unprotected field at 10 with MDT already set by the host, "XY" inside
        processor.process_record(
            &[
                0x05, 0x00, // EW, WCC without MDT reset
                0x11, 0x40, 0x4A, // SBA 10
                0x1D, 0x01, // SF with MDT
                0xE7, 0xE8, // "XY"
                0x11, 0x40, 0x54, // SBA 20
                0x1D, 0x60, // SF protected, ends the field
            ],
            &mut screen,
            false,
        );
        screen.set_cursor(0);
        let out = processor.build_aid_record(&screen, AidKey::Enter, &[]);
        let mut expected = vec![AID_ENTER];
        expected.extend_from_slice(&encode_buffer_address(0));
        expected.push(ORDER_SBA);
        expected.extend_from_slice(&encode_buffer_address(11));
        expected.extend_from_slice(&string_to_ebcdic("XY"));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_build_aid_ui_field_overrides_promotion() {
        let mut screen = Screen::new();
        let mut processor = DataStreamProcessor::new();
        processor.process_record(
            &[0x05, 0x00, 0x11, 0x40, 0x4A, 0x1D, 0x01, 0xE7],
            &mut screen,
            false,
        );
        let out = processor.build_aid_record(&screen, AidKey::Enter, &[(11, "Z".to_string())]);
        // exactly one SBA block, carrying the UI's content
        let sba_count = out.iter().filter(|&&b| b == ORDER_SBA).count();
        assert_eq!(sba_count, 1);
        assert!(out.ends_with(&string_to_ebcdic("Z")));
    }
}
