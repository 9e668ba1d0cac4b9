use crate::piece::{BufferCursor, Piece};

/// A backing buffer referenced by pieces.
///
/// Buffer 0 of a [`PieceTree`](crate::PieceTree) is the append-only add buffer;
/// every other buffer is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBuffer {
    pub(crate) buffer: String,
    pub(crate) line_starts: Vec<usize>,
}

impl Default for StringBuffer {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl StringBuffer {
    pub fn new(buffer: String) -> Self {
        let line_starts = create_line_starts(&buffer);
        Self {
            buffer,
            line_starts,
        }
    }

    /// Build from text whose line starts were already computed by the caller.
    pub fn with_line_starts(buffer: String, line_starts: Vec<usize>) -> Self {
        debug_assert_eq!(line_starts.first().copied(), Some(0));
        Self {
            buffer,
            line_starts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub(crate) fn byte_at(&self, offset: usize) -> Option<u8> {
        self.buffer.as_bytes().get(offset).copied()
    }

    pub(crate) fn ends_with_cr(&self) -> bool {
        self.buffer.as_bytes().last() == Some(&b'\r')
    }

    pub(crate) fn offset_of(&self, cursor: BufferCursor) -> usize {
        self.line_starts[cursor.line] + cursor.column
    }

    /// Text covered by `piece`, which must point into this buffer.
    pub(crate) fn piece_text(&self, piece: &Piece) -> &str {
        &self.buffer[self.offset_of(piece.start)..self.offset_of(piece.end)]
    }
}

/// Offsets of the first byte after every line break, starting with `0`.
///
/// `\r\n`, `\r` and `\n` each count as a single break.
pub fn create_line_starts(text: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'\r' => {
                if i + 1 < len && bytes[i + 1] == b'\n' {
                    // \r\n case
                    line_starts.push(i + 2);
                    i += 1; // skip the \n
                } else {
                    line_starts.push(i + 1);
                }
            }
            b'\n' => line_starts.push(i + 1),
            _ => {}
        }
        i += 1;
    }

    line_starts
}

/// Line starts plus the line ending statistics a chunk loader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStarts {
    pub line_starts: Vec<usize>,
    pub cr: usize,
    pub lf: usize,
    pub crlf: usize,
    pub is_basic_ascii: bool,
}

impl LineStarts {
    pub fn scan(text: &str) -> Self {
        let mut line_starts = vec![0];
        let (mut cr, mut lf, mut crlf) = (0, 0, 0);
        let mut is_basic_ascii = true;
        let bytes = text.as_bytes();
        let len = bytes.len();
        let mut i = 0;

        while i < len {
            let chr = bytes[i];
            match chr {
                b'\r' => {
                    if i + 1 < len && bytes[i + 1] == b'\n' {
                        crlf += 1;
                        line_starts.push(i + 2);
                        i += 1;
                    } else {
                        cr += 1;
                        line_starts.push(i + 1);
                    }
                }
                b'\n' => {
                    lf += 1;
                    line_starts.push(i + 1);
                }
                _ => {
                    if is_basic_ascii && chr != b'\t' && !(0x20..=0x7e).contains(&chr) {
                        is_basic_ascii = false;
                    }
                }
            }
            i += 1;
        }

        Self {
            line_starts,
            cr,
            lf,
            crlf,
            is_basic_ascii,
        }
    }
}
