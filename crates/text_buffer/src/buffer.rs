use std::str::FromStr;

use piece_tree::{EndOfLine, PieceTree, PieceTreeSnapshot, Position, Range, StringBuffer};

use crate::TextBufferBuilder;
use crate::strings::{first_non_whitespace_index, last_non_whitespace_index};

/// Line ending requested by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfLinePreference {
    /// Whatever the buffer uses.
    #[default]
    TextDefined,
    Lf,
    CrLf,
}

/// A document: the piece tree plus BOM and content hints.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    pub(crate) tree: PieceTree,
    pub(crate) bom: String,
    pub(crate) might_contain_rtl: bool,
    pub(crate) might_contain_non_basic_ascii: bool,
}

impl TextBuffer {
    pub(crate) fn new(tree: PieceTree, bom: String, contains_rtl: bool, is_basic_ascii: bool) -> Self {
        Self {
            tree,
            bom,
            might_contain_rtl: contains_rtl,
            might_contain_non_basic_ascii: !is_basic_ascii,
        }
    }

    /// Build from multiple chunks, normalizing line endings to the majority.
    pub fn from_chunks(chunks: Vec<StringBuffer>) -> Self {
        let mut builder = TextBufferBuilder::new();
        for chunk in &chunks {
            builder.accept_chunk(chunk.as_str());
        }
        builder.finish(true).create(EndOfLine::Lf)
    }

    pub fn bom(&self) -> &str {
        &self.bom
    }

    pub fn eol(&self) -> EndOfLine {
        self.tree.eol()
    }

    /// Rewrite every line break to `eol`.
    pub fn set_eol(&mut self, eol: EndOfLine) {
        self.tree.set_eol(eol);
    }

    pub fn might_contain_rtl(&self) -> bool {
        self.might_contain_rtl
    }

    pub fn might_contain_non_basic_ascii(&self) -> bool {
        self.might_contain_non_basic_ascii
    }

    /// The underlying piece tree.
    pub fn piece_tree(&self) -> &PieceTree {
        &self.tree
    }

    /// Raw insert at a byte offset. Line breaks in `value` are kept as is.
    pub fn insert(&mut self, offset: usize, value: &str) {
        self.tree.insert(offset, value, false);
    }

    pub fn delete(&mut self, offset: usize, len: usize) {
        self.tree.delete(offset, len);
    }

    /// Same as [`TextBuffer::insert`], addressed by position.
    pub fn insert_at(&mut self, line: usize, column: usize, value: &str) {
        let off = self.get_offset_at(line, column);
        self.insert(off, value);
    }

    pub fn delete_at(&mut self, line: usize, column: usize, len: usize) {
        let off = self.get_offset_at(line, column);
        self.delete(off, len);
    }

    /// Whole document, BOM excluded.
    pub fn get_text(&self) -> String {
        self.tree.get_text()
    }

    /// Never 0: an empty document has one empty line.
    pub fn get_line_count(&self) -> usize {
        self.tree.line_count()
    }

    pub fn get_length(&self) -> usize {
        self.tree.len()
    }

    /// Line text without its terminator, empty past the last line.
    pub fn get_line_content(&self, line_number: usize) -> String {
        self.tree.get_line_content(line_number)
    }

    pub fn get_lines_content(&self) -> Vec<String> {
        self.tree.get_lines_content()
    }

    pub fn get_lines_raw_content(&self) -> String {
        self.tree.get_lines_raw_content()
    }

    /// Bytes in the line, terminator excluded.
    pub fn get_line_length(&self, line_number: usize) -> usize {
        self.tree.get_line_length(line_number)
    }

    /// Byte at 0-based `index` of a line.
    pub fn get_line_char_code(&self, line_number: usize, index: usize) -> Option<u8> {
        self.tree.get_line_char_code(line_number, index)
    }

    pub fn get_line_min_column(&self, _line_number: usize) -> usize {
        1
    }

    /// Column just past the line's last byte.
    pub fn get_line_max_column(&self, line_number: usize) -> usize {
        self.get_line_length(line_number) + 1
    }

    /// Column of the first char that is not a space or tab, 0 for blank lines.
    pub fn get_line_first_non_whitespace_column(&self, line_number: usize) -> usize {
        first_non_whitespace_index(&self.get_line_content(line_number)).map_or(0, |i| i + 1)
    }

    /// Column after the last char that is not a space or tab, 0 for blank lines.
    pub fn get_line_last_non_whitespace_column(&self, line_number: usize) -> usize {
        last_non_whitespace_index(&self.get_line_content(line_number)).map_or(0, |i| i + 2)
    }

    /// Byte offset of a position. Columns past the line end are clamped.
    pub fn get_offset_at(&self, line_number: usize, column: usize) -> usize {
        self.tree.get_offset_at(line_number, column)
    }

    pub fn get_position_at(&self, offset: usize) -> Position {
        self.tree.get_position_at(offset)
    }

    pub fn get_range_at(&self, offset: usize, len: usize) -> Range {
        let start = self.get_position_at(offset);
        let end = self.get_position_at(offset + len);
        Range::from_positions(start, end)
    }

    pub fn get_value_in_range(&self, range: &Range, eol: EndOfLinePreference) -> String {
        if range.is_empty() {
            return String::new();
        }
        self.tree.get_value_in_range(range, Some(self.end_of_line(eol)))
    }

    /// Char starting at byte `offset`, or `None` past the end or inside a
    /// multibyte char. Line terminators come back as stored.
    pub fn get_value_at(&self, offset: usize) -> Option<char> {
        if offset >= self.get_length() {
            return None;
        }
        let position = self.get_position_at(offset);
        let content = self.get_line_content(position.line);
        let index = position.column - 1;
        if index >= content.len() {
            return self.tree.get_value_in_offsets(offset, offset + 1).chars().next();
        }

        let width = content.get(index..)?.chars().next()?.len_utf8();
        let range = Range::new(position.line, position.column, position.line, position.column + width);
        self.get_value_in_range(&range, EndOfLinePreference::TextDefined)
            .chars()
            .next()
    }

    /// Byte length of [`TextBuffer::get_value_in_range`] without building it.
    pub fn get_value_length_in_range(&self, range: &Range, eol: EndOfLinePreference) -> usize {
        if range.is_empty() {
            return 0;
        }
        if range.start_line == range.end_line {
            return range.end_column - range.start_column;
        }

        let start_offset = self.get_offset_at(range.start_line, range.start_column);
        let end_offset = self.get_offset_at(range.end_line, range.end_column);
        let length = end_offset - start_offset;

        let desired = self.end_of_line(eol).len();
        let actual = self.eol().len();
        let eol_count = range.end_line - range.start_line;
        if desired > actual {
            length + (desired - actual) * eol_count
        } else {
            length - (actual - desired) * eol_count
        }
    }

    /// Clamp `position` into the document and onto a char boundary.
    pub fn validate_position(&self, position: Position) -> Position {
        let line_count = self.get_line_count();
        if position.line < 1 {
            return Position::new(1, 1);
        }
        if position.line > line_count {
            return Position::new(line_count, self.get_line_max_column(line_count));
        }

        let max_column = self.get_line_max_column(position.line);
        let column = position.column.clamp(1, max_column);
        if column == 1 || column == max_column {
            return Position::new(position.line, column);
        }

        let content = self.get_line_content(position.line);
        let mut index = column - 1;
        while !content.is_char_boundary(index) {
            index -= 1;
        }
        Position::new(position.line, index + 1)
    }

    pub fn validate_range(&self, range: Range) -> Range {
        let start = self.validate_position(range.start());
        let end = self.validate_position(range.end());
        Range::from_positions(start, end)
    }

    /// Read-once copy of the current content, with the BOM if `preserve_bom`.
    pub fn create_snapshot(&self, preserve_bom: bool) -> PieceTreeSnapshot {
        let bom = if preserve_bom { self.bom.as_str() } else { "" };
        self.tree.create_snapshot(bom)
    }

    pub(crate) fn end_of_line(&self, eol: EndOfLinePreference) -> EndOfLine {
        match eol {
            EndOfLinePreference::Lf => EndOfLine::Lf,
            EndOfLinePreference::CrLf => EndOfLine::CrLf,
            EndOfLinePreference::TextDefined => self.eol(),
        }
    }
}

impl PartialEq for TextBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.bom == other.bom && self.eol() == other.eol() && self.tree.equal(&other.tree)
    }
}

impl FromStr for TextBuffer {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut builder = TextBufferBuilder::new();
        builder.accept_chunk(s);
        Ok(builder.finish(true).create(EndOfLine::Lf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> TextBuffer {
        text.parse().unwrap()
    }

    #[test]
    fn from_chunks_counts_lines() {
        let buffer = TextBuffer::from_chunks(vec![
            StringBuffer::new("abc\n".to_string()),
            StringBuffer::new("def".to_string()),
        ]);
        assert_eq!(buffer.get_line_count(), 2);
        assert_eq!(buffer.get_line_content(1), "abc");
        assert_eq!(buffer.get_line_content(2), "def");
    }

    #[test]
    fn insert_and_delete_at_positions() {
        let mut buffer = buffer("hello\nworld");
        buffer.insert_at(2, 1, ">> ");
        assert_eq!(buffer.get_text(), "hello\n>> world");
        buffer.delete_at(1, 1, 6);
        assert_eq!(buffer.get_text(), ">> world");
        assert_eq!(buffer.get_line_count(), 1);
    }

    #[test]
    fn value_at_reads_single_chars() {
        let buffer = buffer("a\u{e9}\r\nb");
        assert_eq!(buffer.get_value_at(0), Some('a'));
        assert_eq!(buffer.get_value_at(1), Some('\u{e9}'));
        assert_eq!(buffer.get_value_at(2), None);
        assert_eq!(buffer.get_value_at(3), Some('\r'));
        assert_eq!(buffer.get_value_at(4), Some('\n'));
        assert_eq!(buffer.get_value_at(5), Some('b'));
        assert_eq!(buffer.get_value_at(6), None);
    }

    #[test]
    fn whitespace_columns() {
        let buffer = buffer("  \tfoo bar  \n   \nx");
        assert_eq!(buffer.get_line_first_non_whitespace_column(1), 4);
        assert_eq!(buffer.get_line_last_non_whitespace_column(1), 11);
        assert_eq!(buffer.get_line_first_non_whitespace_column(2), 0);
        assert_eq!(buffer.get_line_last_non_whitespace_column(2), 0);
        assert_eq!(buffer.get_line_min_column(3), 1);
        assert_eq!(buffer.get_line_max_column(3), 2);
    }

    #[test]
    fn value_length_accounts_for_requested_eol() {
        let buffer = buffer("ab\ncd\nef");
        let range = Range::new(1, 2, 3, 2);
        assert_eq!(
            buffer.get_value_in_range(&range, EndOfLinePreference::TextDefined),
            "b\ncd\ne"
        );
        assert_eq!(
            buffer.get_value_in_range(&range, EndOfLinePreference::CrLf),
            "b\r\ncd\r\ne"
        );
        assert_eq!(buffer.get_value_length_in_range(&range, EndOfLinePreference::TextDefined), 6);
        assert_eq!(buffer.get_value_length_in_range(&range, EndOfLinePreference::CrLf), 8);
        assert_eq!(buffer.get_value_length_in_range(&Range::new(2, 1, 2, 3), EndOfLinePreference::CrLf), 2);
    }

    #[test]
    fn range_at_offsets() {
        let buffer = buffer("ab\ncd");
        assert_eq!(buffer.get_range_at(1, 3), Range::new(1, 2, 2, 2));
    }

    #[test]
    fn validate_clamps_into_document() {
        let buffer = buffer("ab\nc\u{e9}d");
        assert_eq!(buffer.validate_position(Position::new(0, 5)), Position::new(1, 1));
        assert_eq!(buffer.validate_position(Position::new(9, 1)), Position::new(2, 5));
        assert_eq!(buffer.validate_position(Position::new(1, 0)), Position::new(1, 1));
        assert_eq!(buffer.validate_position(Position::new(1, 7)), Position::new(1, 3));
        // inside the two bytes of the accented char
        assert_eq!(buffer.validate_position(Position::new(2, 3)), Position::new(2, 2));
        assert_eq!(
            buffer.validate_range(Range::new(2, 9, 1, 0)),
            Range::new(1, 1, 2, 5)
        );
    }

    #[test]
    fn equality_includes_bom_and_eol() {
        let a = buffer("x\ny");
        let b = TextBuffer::from_chunks(vec![
            StringBuffer::new("x".to_string()),
            StringBuffer::new("\ny".to_string()),
        ]);
        assert_eq!(a, b);

        let with_bom = buffer("\u{feff}x\ny");
        assert_eq!(with_bom.bom(), "\u{feff}");
        assert_ne!(a, with_bom);

        let mut crlf = buffer("x\ny");
        crlf.set_eol(EndOfLine::CrLf);
        assert_ne!(a, crlf);
        assert_eq!(crlf.get_text(), "x\r\ny");
    }

    #[test]
    fn snapshot_optionally_keeps_bom() {
        let buffer = buffer("\u{feff}abc");
        assert_eq!(buffer.get_text(), "abc");
        assert_eq!(buffer.create_snapshot(true).collect::<String>(), "\u{feff}abc");
        assert_eq!(buffer.create_snapshot(false).collect::<String>(), "abc");
    }

    #[test]
    fn content_hints_from_initial_text() {
        let plain = buffer("plain");
        assert!(!plain.might_contain_rtl());
        assert!(!plain.might_contain_non_basic_ascii());

        let hebrew = buffer("\u{5e9}\u{5dc}\u{5d5}\u{5dd}");
        assert!(hebrew.might_contain_rtl());
        assert!(hebrew.might_contain_non_basic_ascii());
    }
}
