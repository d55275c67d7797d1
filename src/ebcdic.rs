//! EBCDIC character translation
//!
//! 3270 data streams carry text in EBCDIC. This module holds the fixed
//! 256-entry EBCDIC-to-display table used when writing host data into the
//! screen buffer, and the inverse mapping used when transmitting field
//! contents back to the host.
//!
//! Code points without a printable mapping translate to SPACE on input;
//! characters without an EBCDIC equivalent encode as 0x40 (EBCDIC space) on
//! output.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// EBCDIC space, the fill byte for anything unmappable
pub const EBCDIC_SPACE: u8 = 0x40;

/// EBCDIC to display-character translation table
const EBCDIC_TO_DISPLAY: [char; 256] = [
    // 0x00-0x0F: control
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0x10-0x1F: control
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0x20-0x2F: control
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0x30-0x3F: control
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0x40-0x4F: space and punctuation
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', '.', '<', '(', '+', '|',
    // 0x50-0x5F
    '&', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', '!', '$', '*', ')', ';', '^',
    // 0x60-0x6F
    '-', '/', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', '¦', ',', '%', '_', '>', '?',
    // 0x70-0x7F
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', '`', ':', '#', '@', '\'', '=', '"',
    // 0x80-0x8F: lowercase a-i
    ' ', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0x90-0x9F: lowercase j-r
    ' ', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0xA0-0xAF: lowercase s-z
    ' ', '~', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', ' ', ' ', ' ', '[', ' ', ' ',
    // 0xB0-0xBF
    ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ']', ' ', ' ',
    // 0xC0-0xCF: left brace and uppercase A-I
    '{', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0xD0-0xDF: right brace and uppercase J-R
    '}', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0xE0-0xEF: backslash and uppercase S-Z
    '\\', ' ', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ' ', ' ', ' ', ' ', ' ', ' ',
    // 0xF0-0xFF: digits 0-9
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ' ', ' ', ' ', ' ', ' ', ' ',
];

/// Inverse table, derived once from the forward table. The first (lowest)
/// EBCDIC code point wins for a given character.
static DISPLAY_TO_EBCDIC: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (code, &ch) in EBCDIC_TO_DISPLAY.iter().enumerate() {
        if ch != ' ' {
            map.entry(ch).or_insert(code as u8);
        }
    }
    map.insert(' ', EBCDIC_SPACE);
    map
});

/// Convert an EBCDIC byte to its display character
pub fn ebcdic_to_display(byte: u8) -> char {
    EBCDIC_TO_DISPLAY[byte as usize]
}

/// Convert a display character to its EBCDIC byte
pub fn display_to_ebcdic(ch: char) -> u8 {
    *DISPLAY_TO_EBCDIC.get(&ch).unwrap_or(&EBCDIC_SPACE)
}

/// Convert an EBCDIC byte slice to a display string
pub fn ebcdic_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| ebcdic_to_display(b)).collect()
}

/// Convert a display string to EBCDIC bytes
pub fn string_to_ebcdic(s: &str) -> Vec<u8> {
    s.chars().map(display_to_ebcdic).collect()
}
