//! Screen buffer management
//!
//! The screen is a fixed-geometry grid of display characters with a parallel
//! array of attribute bytes, an ordered field list, and a cursor address.
//! The order interpreter mutates it while processing host records; the UI
//! collaborator reads it to render and writes into it as the operator types.

use log::debug;

use crate::field::{Field, FieldManager};

/// Default 3270 Model 2 geometry
pub const DEFAULT_ROWS: usize = 24;
pub const DEFAULT_COLS: usize = 80;

/// 3270 screen buffer
#[derive(Debug, Clone)]
pub struct Screen {
    rows: usize,
    cols: usize,
    cells: Vec<char>,
    attributes: Vec<u8>,
    fields: FieldManager,
    cursor_address: u16,
    keyboard_locked: bool,
    alarm: bool,
}

impl Screen {
    /// Create a 24x80 screen
    pub fn new() -> Self {
        Self::with_size(DEFAULT_ROWS, DEFAULT_COLS)
    }

    /// Create a screen with an explicit geometry
    pub fn with_size(rows: usize, cols: usize) -> Self {
        let size = rows * cols;
        Self {
            rows,
            cols,
            cells: vec![' '; size],
            attributes: vec![0; size],
            fields: FieldManager::new(),
            cursor_address: 0,
            keyboard_locked: true,
            alarm: false,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total cell count
    pub fn buffer_size(&self) -> u16 {
        (self.rows * self.cols) as u16
    }

    /// Blank every cell, drop all fields, home the cursor
    pub fn clear(&mut self) {
        self.cells.fill(' ');
        self.attributes.fill(0);
        self.fields.clear();
        self.cursor_address = 0;
    }

    /// Cursor position as a buffer address
    pub fn cursor_address(&self) -> u16 {
        self.cursor_address
    }

    /// Cursor position as (row, col)
    pub fn cursor_position(&self) -> (usize, usize) {
        let addr = self.cursor_address as usize;
        (addr / self.cols, addr % self.cols)
    }

    /// Move the cursor, wrapping modulo the geometry
    pub fn set_cursor(&mut self, address: u16) {
        self.cursor_address = address % self.buffer_size();
    }

    /// Host-side write: set a cell without touching Modified Data Tags
    pub fn set_char(&mut self, address: u16, ch: char) {
        if let Some(cell) = self.cells.get_mut(address as usize) {
            *cell = ch;
        }
    }

    /// Operator-side write: set a cell and flag the containing field modified
    pub fn write_char(&mut self, address: u16, ch: char) {
        if let Some(cell) = self.cells.get_mut(address as usize) {
            *cell = ch;
        }
        if let Some(field) = self.fields.field_containing_mut(address) {
            field.set_modified(true);
            let attr_addr = field.address as usize;
            let attr = field.attribute;
            self.attributes[attr_addr] = attr;
        }
    }

    /// Character at an address
    pub fn char_at(&self, address: u16) -> char {
        self.cells.get(address as usize).copied().unwrap_or(' ')
    }

    /// Attribute byte at an address (zero when the cell holds no attribute)
    pub fn attribute_at(&self, address: u16) -> u8 {
        self.attributes.get(address as usize).copied().unwrap_or(0)
    }

    /// Whether the cell at `address` holds a field attribute byte
    pub fn is_attribute_cell(&self, address: u16) -> bool {
        self.fields
            .fields()
            .binary_search_by_key(&address, |f| f.address)
            .is_ok()
    }

    /// Whether the cell at `address` lies in a protected field.
    /// Unformatted cells are unprotected.
    pub fn is_protected(&self, address: u16) -> bool {
        self.fields
            .field_containing(address)
            .map(|f| f.protected)
            .unwrap_or(false)
    }

    /// Register a field at `address` with the given attribute byte. The cell
    /// itself renders as a space. A field already at that address is
    /// replaced.
    pub fn insert_field(&mut self, address: u16, attribute: u8) {
        let field = Field::from_attribute(address, attribute);
        debug!(
            "insert_field: addr={} (row={}, col={}) protected={} display={:?}",
            address,
            address as usize / self.cols,
            address as usize % self.cols,
            field.protected,
            field.display
        );
        self.cells[address as usize] = ' ';
        self.attributes[address as usize] = attribute;
        self.fields.insert(field);
    }

    /// All fields, ordered by address
    pub fn fields(&self) -> &[Field] {
        self.fields.fields()
    }

    /// Address of the first data cell of the next unprotected field
    pub fn next_input_field(&self, from: u16) -> Option<u16> {
        self.fields.next_input_field(from, self.buffer_size())
    }

    /// Address of the first data cell of the previous unprotected field
    pub fn prev_input_field(&self, from: u16) -> Option<u16> {
        self.fields.prev_input_field(from, self.buffer_size())
    }

    /// True when `address` lies in a non-display field. Rendering the cells
    /// masked is the UI's job; this only exposes the classification.
    pub fn is_password(&self, address: u16) -> bool {
        self.fields
            .field_containing(address)
            .map(|f| !f.display.is_visible())
            .unwrap_or(false)
    }

    /// Contents of a field given its record, with trailing blanks trimmed.
    /// A field whose attribute byte sits on the last cell has no data.
    pub fn field_text(&self, field: &Field) -> String {
        let start = field.address as usize + 1;
        let end = self.fields.field_end(field, self.buffer_size()) as usize;
        if start >= end {
            return String::new();
        }
        let text: String = self.cells[start..end].iter().collect();
        text.trim_end().to_string()
    }

    /// Clear every Modified Data Tag, keeping the attribute array in sync
    pub fn reset_modified(&mut self) {
        self.fields.reset_mdt();
        for field in self.fields.fields() {
            self.attributes[field.address as usize] = field.attribute;
        }
    }

    /// Screen contents as text, one line per row
    pub fn to_text(&self) -> String {
        (0..self.rows)
            .map(|r| self.row_text(r))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A single row as text
    pub fn row_text(&self, row: usize) -> String {
        let start = row * self.cols;
        self.cells[start..start + self.cols].iter().collect()
    }

    /// Text of `len` cells starting at (row, col), clamped to the buffer
    pub fn string_at(&self, row: usize, col: usize, len: usize) -> String {
        let start = (row * self.cols + col).min(self.cells.len());
        let end = (start + len).min(self.cells.len());
        self.cells[start..end].iter().collect()
    }

    /// Locate text on the screen, returning (row, col) of its first cell
    pub fn find_text(&self, text: &str) -> Option<(usize, usize)> {
        if text.is_empty() {
            return None;
        }
        let flat: String = self.cells.iter().collect();
        flat.find(text).map(|byte_pos| {
            // cell index, not byte index: the broken-bar glyph is multi-byte
            let cell = flat[..byte_pos].chars().count();
            (cell / self.cols, cell % self.cols)
        })
    }

    pub fn lock_keyboard(&mut self) {
        self.keyboard_locked = true;
    }

    pub fn unlock_keyboard(&mut self) {
        self.keyboard_locked = false;
    }

    pub fn is_keyboard_locked(&self) -> bool {
        self.keyboard_locked
    }

    pub fn set_alarm(&mut self) {
        self.alarm = true;
    }

    /// Read and clear the alarm flag
    pub fn take_alarm(&mut self) -> bool {
        std::mem::replace(&mut self.alarm, false)
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            writeln!(f, "{}", self.row_text(row))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ATTR_MDT, ATTR_PROTECTED};

    #[test]
    fn test_geometry() {
        let screen = Screen::new();
        assert_eq!(screen.rows(), 24);
        assert_eq!(screen.cols(), 80);
        assert_eq!(screen.buffer_size(), 1920);
        assert_eq!(screen.cursor_address(), 0);
    }

    #[test]
    fn test_clear() {
        let mut screen = Screen::new();
        screen.set_char(5, 'X');
        screen.insert_field(10, ATTR_PROTECTED);
        screen.set_cursor(42);
        screen.clear();
        assert_eq!(screen.char_at(5), ' ');
        assert_eq!(screen.attribute_at(10), 0);
        assert!(screen.fields().is_empty());
        assert_eq!(screen.cursor_address(), 0);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut screen = Screen::new();
        screen.set_cursor(1920);
        assert_eq!(screen.cursor_address(), 0);
        screen.set_cursor(1925);
        assert_eq!(screen.cursor_address(), 5);
    }

    #[test]
    fn test_host_write_does_not_set_mdt() {
        let mut screen = Screen::new();
        screen.insert_field(10, 0);
        screen.set_char(11, 'A');
        assert!(!screen.fields()[0].modified);
    }

    #[test]
    fn test_operator_write_sets_mdt() {
        let mut screen = Screen::new();
        screen.insert_field(10, 0);
        screen.write_char(11, 'A');
        assert!(screen.fields()[0].modified);
        assert_eq!(screen.attribute_at(10) & ATTR_MDT, ATTR_MDT);
    }

    #[test]
    fn test_insert_field_replaces() {
        let mut screen = Screen::new();
        screen.insert_field(10, 0);
        screen.insert_field(10, ATTR_PROTECTED);
        assert_eq!(screen.fields().len(), 1);
        assert!(screen.fields()[0].protected);
        assert_eq!(screen.char_at(10), ' ');
    }

    #[test]
    fn test_is_password() {
        let mut screen = Screen::new();
        // non-display input field at 100, protected normal field at 200
        screen.insert_field(100, 0x0C);
        screen.insert_field(200, ATTR_PROTECTED);
        assert!(screen.is_password(101));
        assert!(screen.is_password(150));
        assert!(!screen.is_password(201));
        assert!(!screen.is_password(50));
    }

    #[test]
    fn test_field_text_trims_trailing_blanks() {
        let mut screen = Screen::new();
        screen.insert_field(10, 0);
        screen.insert_field(20, ATTR_PROTECTED);
        screen.set_char(11, 'A');
        screen.set_char(12, 'B');
        let field = screen.fields()[0].clone();
        assert_eq!(screen.field_text(&field), "AB");
    }

    #[test]
    fn test_text_queries() {
        let mut screen = Screen::new();
        for (i, ch) in "LOGON".chars().enumerate() {
            screen.set_char((85 + i) as u16, ch);
        }
        assert_eq!(screen.string_at(1, 5, 5), "LOGON");
        assert_eq!(screen.find_text("LOGON"), Some((1, 5)));
        assert_eq!(screen.find_text("MISSING"), None);
        assert!(screen.row_text(1).contains("LOGON"));
    }

    #[test]
    fn test_keyboard_and_alarm() {
        let mut screen = Screen::new();
        assert!(screen.is_keyboard_locked());
        screen.unlock_keyboard();
        assert!(!screen.is_keyboard_locked());
        screen.set_alarm();
        assert!(screen.take_alarm());
        assert!(!screen.take_alarm());
    }
}
