/// A `(line, column)` location inside one backing buffer, both 0-based.
///
/// `line` indexes the buffer's line starts, `column` is a byte distance from
/// that line start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// An immutable span `[start, end)` of one backing buffer.
///
/// `length` and `line_feed_cnt` always describe exactly the bytes between
/// `start` and `end`. Pieces are never edited in place; a node gets a new
/// piece instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Piece {
    pub buffer_idx: usize,
    pub start: BufferCursor,
    pub end: BufferCursor,
    pub length: usize,
    pub line_feed_cnt: usize,
}

impl Piece {
    pub fn new(
        buffer_idx: usize,
        start: BufferCursor,
        end: BufferCursor,
        length: usize,
        line_feed_cnt: usize,
    ) -> Self {
        Self {
            buffer_idx,
            start,
            end,
            length,
            line_feed_cnt,
        }
    }
}
