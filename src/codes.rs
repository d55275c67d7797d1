//! 3270 Data Stream Constants and Codes
//!
//! Command codes, order codes, AID (Attention Identifier) keys, WCC bits and
//! field attribute bits as specified in RFC 1205, RFC 2355 and the IBM 3270
//! Data Stream Programmer's Reference (GA23-0059).
//!
//! 3270 commands exist in two parallel encodings: the "ASCII" form used by
//! local channel attachments and the SNA form used by remote links. Hosts use
//! either, so `CommandCode::from_u8` normalizes both into one tagged variant.

/// 3270 Command Codes (ASCII form)
pub const CMD_WRITE: u8 = 0x01;              // Write
pub const CMD_READ_BUFFER: u8 = 0x02;        // Read Buffer
pub const CMD_ERASE_WRITE: u8 = 0x05;        // Erase/Write
pub const CMD_READ_MODIFIED: u8 = 0x06;      // Read Modified
pub const CMD_ERASE_WRITE_ALTERNATE: u8 = 0x0D; // Erase/Write Alternate
pub const CMD_WRITE_STRUCTURED_FIELD: u8 = 0x11; // Write Structured Field

/// 3270 Command Codes (SNA form)
pub const SNA_CMD_WRITE: u8 = 0xF1;
pub const SNA_CMD_READ_BUFFER: u8 = 0xF2;
pub const SNA_CMD_WRITE_STRUCTURED_FIELD: u8 = 0xF3;
pub const SNA_CMD_ERASE_WRITE: u8 = 0xF5;
pub const SNA_CMD_READ_MODIFIED: u8 = 0xF6;
pub const SNA_CMD_ERASE_WRITE_ALTERNATE: u8 = 0x7E;

/// 3270 Order Codes
/// These are embedded in the data stream to control formatting
pub const ORDER_PT: u8 = 0x05;    // Program Tab
pub const ORDER_GE: u8 = 0x08;    // Graphic Escape
pub const ORDER_SBA: u8 = 0x11;   // Set Buffer Address
pub const ORDER_EUA: u8 = 0x12;   // Erase Unprotected to Address
pub const ORDER_IC: u8 = 0x13;    // Insert Cursor
pub const ORDER_SF: u8 = 0x1D;    // Start Field
pub const ORDER_SA: u8 = 0x28;    // Set Attribute
pub const ORDER_SFE: u8 = 0x29;   // Start Field Extended
pub const ORDER_MF: u8 = 0x2C;    // Modify Field
pub const ORDER_RA: u8 = 0x3C;    // Repeat to Address

/// Write Control Character (WCC) bits
pub const WCC_RESET: u8 = 0x40;       // Reset
pub const WCC_ALARM: u8 = 0x04;       // Sound alarm
pub const WCC_RESTORE: u8 = 0x02;     // Restore (unlock) keyboard
pub const WCC_RESET_MDT: u8 = 0x01;   // Reset MDT bits

/// Field attribute byte bits (SF order operand)
pub const ATTR_PROTECTED: u8 = 0x20;      // Bit 5: protected field
pub const ATTR_NUMERIC: u8 = 0x10;        // Bit 4: numeric-only field
pub const ATTR_DISPLAY_MASK: u8 = 0x0C;   // Bits 2-3: display/intensity
pub const ATTR_MDT: u8 = 0x01;            // Bit 0: Modified Data Tag

/// SFE attribute-pair type selecting the basic 3270 field attribute
pub const XA_3270: u8 = 0xC0;

/// AID (Attention Identifier) codes
pub const AID_NONE: u8 = 0x60;
pub const AID_ENTER: u8 = 0x7D;
pub const AID_PF1: u8 = 0xF1;
pub const AID_PF2: u8 = 0xF2;
pub const AID_PF3: u8 = 0xF3;
pub const AID_PF4: u8 = 0xF4;
pub const AID_PF5: u8 = 0xF5;
pub const AID_PF6: u8 = 0xF6;
pub const AID_PF7: u8 = 0xF7;
pub const AID_PF8: u8 = 0xF8;
pub const AID_PF9: u8 = 0xF9;
pub const AID_PF10: u8 = 0x7A;
pub const AID_PF11: u8 = 0x7B;
pub const AID_PF12: u8 = 0x7C;
pub const AID_PF13: u8 = 0xC1;
pub const AID_PF14: u8 = 0xC2;
pub const AID_PF15: u8 = 0xC3;
pub const AID_PF16: u8 = 0xC4;
pub const AID_PF17: u8 = 0xC5;
pub const AID_PF18: u8 = 0xC6;
pub const AID_PF19: u8 = 0xC7;
pub const AID_PF20: u8 = 0xC8;
pub const AID_PF21: u8 = 0xC9;
pub const AID_PF22: u8 = 0x4A;
pub const AID_PF23: u8 = 0x4B;
pub const AID_PF24: u8 = 0x4C;
pub const AID_PA1: u8 = 0x6C;
pub const AID_PA2: u8 = 0x6E;
pub const AID_PA3: u8 = 0x6B;
pub const AID_CLEAR: u8 = 0x6D;
pub const AID_SYSREQ: u8 = 0xF0;
pub const AID_STRUCTURED_FIELD: u8 = 0x88;

/// TN3270E message header
pub const TN3270E_HEADER_LEN: usize = 5;
pub const TN3270E_DATA_3270: u8 = 0x00;   // data-type byte of a 3270-DATA message

/// Structured field identifiers and Read Partition operations
pub const SF_READ_PARTITION: u8 = 0x01;
pub const READ_PARTITION_QUERY: u8 = 0x02;
pub const READ_PARTITION_QUERY_LIST: u8 = 0xFF;

/// Query Reply codes
pub const QR_PREFIX: u8 = 0x81;           // first byte of every Query Reply SF
pub const QR_SUMMARY: u8 = 0x80;
pub const QR_USABLE_AREA: u8 = 0x81;
pub const QR_HIGHLIGHTING: u8 = 0x87;
pub const QR_REPLY_MODES: u8 = 0x88;

/// Enum representation of 3270 commands, normalized over both encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    Write,
    EraseWrite,
    EraseWriteAlternate,
    WriteStructuredField,
    ReadModified,
    ReadBuffer,
}

impl CommandCode {
    /// Convert a byte value to a CommandCode, accepting ASCII and SNA forms
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            CMD_WRITE | SNA_CMD_WRITE => Some(Self::Write),
            CMD_ERASE_WRITE | SNA_CMD_ERASE_WRITE => Some(Self::EraseWrite),
            CMD_ERASE_WRITE_ALTERNATE | SNA_CMD_ERASE_WRITE_ALTERNATE => Some(Self::EraseWriteAlternate),
            CMD_WRITE_STRUCTURED_FIELD | SNA_CMD_WRITE_STRUCTURED_FIELD => Some(Self::WriteStructuredField),
            CMD_READ_MODIFIED | SNA_CMD_READ_MODIFIED => Some(Self::ReadModified),
            CMD_READ_BUFFER | SNA_CMD_READ_BUFFER => Some(Self::ReadBuffer),
            _ => None,
        }
    }

    /// Whether the command clears the screen before applying orders
    pub fn erases(self) -> bool {
        matches!(self, Self::EraseWrite | Self::EraseWriteAlternate)
    }
}

/// Enum representation of AID keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AidKey {
    None,
    Enter,
    Clear,
    PA1,
    PA2,
    PA3,
    PF1, PF2, PF3, PF4, PF5, PF6,
    PF7, PF8, PF9, PF10, PF11, PF12,
    PF13, PF14, PF15, PF16, PF17, PF18,
    PF19, PF20, PF21, PF22, PF23, PF24,
    SysReq,
}

impl AidKey {
    /// Convert a byte value to an AidKey
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            AID_NONE => Some(Self::None),
            AID_ENTER => Some(Self::Enter),
            AID_CLEAR => Some(Self::Clear),
            AID_PA1 => Some(Self::PA1),
            AID_PA2 => Some(Self::PA2),
            AID_PA3 => Some(Self::PA3),
            AID_PF1 => Some(Self::PF1),
            AID_PF2 => Some(Self::PF2),
            AID_PF3 => Some(Self::PF3),
            AID_PF4 => Some(Self::PF4),
            AID_PF5 => Some(Self::PF5),
            AID_PF6 => Some(Self::PF6),
            AID_PF7 => Some(Self::PF7),
            AID_PF8 => Some(Self::PF8),
            AID_PF9 => Some(Self::PF9),
            AID_PF10 => Some(Self::PF10),
            AID_PF11 => Some(Self::PF11),
            AID_PF12 => Some(Self::PF12),
            AID_PF13 => Some(Self::PF13),
            AID_PF14 => Some(Self::PF14),
            AID_PF15 => Some(Self::PF15),
            AID_PF16 => Some(Self::PF16),
            AID_PF17 => Some(Self::PF17),
            AID_PF18 => Some(Self::PF18),
            AID_PF19 => Some(Self::PF19),
            AID_PF20 => Some(Self::PF20),
            AID_PF21 => Some(Self::PF21),
            AID_PF22 => Some(Self::PF22),
            AID_PF23 => Some(Self::PF23),
            AID_PF24 => Some(Self::PF24),
            AID_SYSREQ => Some(Self::SysReq),
            _ => None,
        }
    }

    /// Convert an AidKey to its wire byte
    pub fn to_u8(self) -> u8 {
        match self {
            Self::None => AID_NONE,
            Self::Enter => AID_ENTER,
            Self::Clear => AID_CLEAR,
            Self::PA1 => AID_PA1,
            Self::PA2 => AID_PA2,
            Self::PA3 => AID_PA3,
            Self::PF1 => AID_PF1,
            Self::PF2 => AID_PF2,
            Self::PF3 => AID_PF3,
            Self::PF4 => AID_PF4,
            Self::PF5 => AID_PF5,
            Self::PF6 => AID_PF6,
            Self::PF7 => AID_PF7,
            Self::PF8 => AID_PF8,
            Self::PF9 => AID_PF9,
            Self::PF10 => AID_PF10,
            Self::PF11 => AID_PF11,
            Self::PF12 => AID_PF12,
            Self::PF13 => AID_PF13,
            Self::PF14 => AID_PF14,
            Self::PF15 => AID_PF15,
            Self::PF16 => AID_PF16,
            Self::PF17 => AID_PF17,
            Self::PF18 => AID_PF18,
            Self::PF19 => AID_PF19,
            Self::PF20 => AID_PF20,
            Self::PF21 => AID_PF21,
            Self::PF22 => AID_PF22,
            Self::PF23 => AID_PF23,
            Self::PF24 => AID_PF24,
            Self::SysReq => AID_SYSREQ,
        }
    }

    /// PF key by number (1-24)
    pub fn pf(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::PF1),
            2 => Some(Self::PF2),
            3 => Some(Self::PF3),
            4 => Some(Self::PF4),
            5 => Some(Self::PF5),
            6 => Some(Self::PF6),
            7 => Some(Self::PF7),
            8 => Some(Self::PF8),
            9 => Some(Self::PF9),
            10 => Some(Self::PF10),
            11 => Some(Self::PF11),
            12 => Some(Self::PF12),
            13 => Some(Self::PF13),
            14 => Some(Self::PF14),
            15 => Some(Self::PF15),
            16 => Some(Self::PF16),
            17 => Some(Self::PF17),
            18 => Some(Self::PF18),
            19 => Some(Self::PF19),
            20 => Some(Self::PF20),
            21 => Some(Self::PF21),
            22 => Some(Self::PF22),
            23 => Some(Self::PF23),
            24 => Some(Self::PF24),
            _ => None,
        }
    }

    /// PA key by number (1-3)
    pub fn pa(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::PA1),
            2 => Some(Self::PA2),
            3 => Some(Self::PA3),
            _ => None,
        }
    }

    /// Short Read AIDs carry no cursor address and no field data
    pub fn is_short_read(self) -> bool {
        matches!(self, Self::Clear | Self::PA1 | Self::PA2 | Self::PA3)
    }
}
