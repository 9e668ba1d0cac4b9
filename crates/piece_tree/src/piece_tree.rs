mod buffer;
mod config;
mod eol;
mod piece;
mod range;
mod rb_tree;
mod search_cache;
mod snapshot;

use std::cell::RefCell;
use std::mem;
use std::sync::Arc;

use tracing::{debug, trace};

pub use buffer::{LineStarts, StringBuffer, create_line_starts};
pub use config::{AVERAGE_BUFFER_SIZE, PieceTreeConfig};
pub use eol::{EndOfLine, replace_line_breaks};
pub use piece::{BufferCursor, Piece};
pub use range::{Position, Range};
pub use snapshot::PieceTreeSnapshot;

use rb_tree::{NodeId, RbTree, SENTINEL};
use search_cache::{CacheEntry, SearchCache};

/// A node together with an offset inside its piece.
#[derive(Debug, Clone, Copy)]
struct NodePosition {
    node: NodeId,
    /// Distance from the start of the node's piece.
    remainder: usize,
    node_start_offset: usize,
}

/// Piece table over an augmented red-black tree.
///
/// Offsets are 0-based byte offsets into the UTF-8 document and must fall on
/// `char` boundaries. Lines and columns are 1-based.
#[derive(Debug, Clone)]
pub struct PieceTree {
    tree: RbTree,
    /// Buffer 0 is the add buffer; the rest are immutable chunks.
    buffers: Vec<Arc<StringBuffer>>,
    length: usize,
    line_count: usize,
    eol: EndOfLine,
    eol_normalized: bool,
    /// End of the most recent append into buffer 0.
    last_change_buffer_pos: BufferCursor,
    config: PieceTreeConfig,
    search_cache: RefCell<SearchCache>,
    last_visited_line: RefCell<Option<(usize, String)>>,
}

impl Default for PieceTree {
    fn default() -> Self {
        Self::new(Vec::new(), EndOfLine::Lf, true)
    }
}

impl PieceTree {
    /// Build a tree over `chunks`, one piece per non-empty chunk.
    ///
    /// `eol_normalized` claims every line break in `chunks` already equals `eol`.
    pub fn new(chunks: Vec<StringBuffer>, eol: EndOfLine, eol_normalized: bool) -> Self {
        Self::with_config(chunks, eol, eol_normalized, PieceTreeConfig::default())
    }

    pub fn with_config(
        chunks: Vec<StringBuffer>,
        eol: EndOfLine,
        eol_normalized: bool,
        config: PieceTreeConfig,
    ) -> Self {
        let mut tree = Self {
            tree: RbTree::new(),
            buffers: vec![Arc::new(StringBuffer::default())],
            length: 0,
            line_count: 1,
            eol,
            eol_normalized,
            last_change_buffer_pos: BufferCursor::default(),
            config,
            search_cache: RefCell::new(SearchCache::new(config.search_cache_limit())),
            last_visited_line: RefCell::new(None),
        };
        tree.create(chunks, eol, eol_normalized);
        tree
    }

    fn create(&mut self, chunks: Vec<StringBuffer>, eol: EndOfLine, eol_normalized: bool) {
        self.buffers = vec![Arc::new(StringBuffer::default())];
        self.last_change_buffer_pos = BufferCursor::default();
        self.tree = RbTree::new();
        self.line_count = 1;
        self.length = 0;
        self.eol = eol;
        self.eol_normalized = eol_normalized;

        let mut last_node = SENTINEL;
        for chunk in chunks {
            if chunk.is_empty() {
                continue;
            }
            let line_starts = chunk.line_starts();
            let last_line = line_starts.len() - 1;
            let piece = Piece::new(
                self.buffers.len(),
                BufferCursor::new(0, 0),
                BufferCursor::new(last_line, chunk.len() - line_starts[last_line]),
                chunk.len(),
                last_line,
            );
            self.buffers.push(Arc::new(chunk));
            last_node = self.tree.insert_right(last_node, piece);
        }

        self.search_cache.get_mut().clear();
        *self.last_visited_line.get_mut() = None;
        self.compute_buffer_metadata();
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn eol(&self) -> EndOfLine {
        self.eol
    }

    /// Whether every line break is known to equal [`PieceTree::eol`].
    pub fn is_eol_normalized(&self) -> bool {
        self.eol_normalized
    }

    /// Rewrite every line break to `eol` and rebuild the tree.
    pub fn set_eol(&mut self, eol: EndOfLine) {
        self.normalize_eol(eol);
    }

    pub fn config(&self) -> &PieceTreeConfig {
        &self.config
    }

    pub fn set_average_buffer_size(&mut self, size: usize) {
        self.config = self.config.with_average_buffer_size(size);
    }

    fn normalize_eol(&mut self, eol: EndOfLine) {
        let average_buffer_size = self.config.average_buffer_size();
        let min = average_buffer_size - average_buffer_size / 3;
        let max = min * 2;

        let mut temp_chunk = String::new();
        let mut chunks = Vec::new();
        for node in self.tree.iter() {
            let text = self.node_content(node);
            if temp_chunk.len() <= min || temp_chunk.len() + text.len() < max {
                temp_chunk.push_str(text);
                continue;
            }

            // a \r at the cut may pair with a \n in the next piece
            let carry_cr = temp_chunk.ends_with('\r');
            if carry_cr {
                temp_chunk.pop();
            }
            chunks.push(StringBuffer::new(replace_line_breaks(&temp_chunk, eol.as_str())));
            temp_chunk.clear();
            if carry_cr {
                temp_chunk.push('\r');
            }
            temp_chunk.push_str(text);
        }
        if !temp_chunk.is_empty() {
            chunks.push(StringBuffer::new(replace_line_breaks(&temp_chunk, eol.as_str())));
        }

        debug!(
            eol = %eol,
            chunks = chunks.len(),
            length = self.length,
            "normalizing line endings"
        );
        self.create(chunks, eol, true);
    }

    fn should_check_crlf(&self) -> bool {
        !(self.eol_normalized && self.eol == EndOfLine::Lf)
    }

    fn piece(&self, node: NodeId) -> Piece {
        *self.tree.piece(node)
    }

    fn node_content(&self, node: NodeId) -> &str {
        let piece = self.tree.piece(node);
        self.buffers[piece.buffer_idx].piece_text(piece)
    }

    fn offset_in_buffer(&self, buffer_idx: usize, cursor: BufferCursor) -> usize {
        self.buffers[buffer_idx].offset_of(cursor)
    }

    // region: offset / position

    /// Offset of the 1-based `(line_number, column)`.
    pub fn get_offset_at(&self, line_number: usize, column: usize) -> usize {
        let mut line_number = line_number;
        let mut left_len = 0;
        let mut x = self.tree.root();

        while x != SENTINEL {
            let piece = self.piece(x);
            let lf_left = self.tree.lf_left(x);
            if self.tree.left(x) != SENTINEL && lf_left + 1 >= line_number {
                x = self.tree.left(x);
            } else if lf_left + piece.line_feed_cnt + 1 >= line_number {
                left_len += self.tree.size_left(x);
                let accumulated =
                    self.get_accumulated_value(x, line_number as isize - lf_left as isize - 2);
                return (left_len + accumulated + column).saturating_sub(1);
            } else {
                line_number -= lf_left + piece.line_feed_cnt;
                left_len += self.tree.size_left(x) + piece.length;
                x = self.tree.right(x);
            }
        }

        left_len
    }

    /// 1-based position of `offset`.
    pub fn get_position_at(&self, offset: usize) -> Position {
        let original_offset = offset;
        let mut offset = offset;
        let mut x = self.tree.root();
        let mut lf_cnt = 0;

        while x != SENTINEL {
            let piece = self.piece(x);
            let size_left = self.tree.size_left(x);
            if size_left != 0 && size_left >= offset {
                x = self.tree.left(x);
            } else if size_left + piece.length >= offset {
                let (index, remainder) = self.get_index_of(x, offset - size_left);
                lf_cnt += self.tree.lf_left(x) + index;

                if index == 0 {
                    let line_start_offset = self.get_offset_at(lf_cnt + 1, 1);
                    let column = original_offset - line_start_offset;
                    return Position::new(lf_cnt + 1, column + 1);
                }
                return Position::new(lf_cnt + 1, remainder + 1);
            } else {
                offset -= size_left + piece.length;
                lf_cnt += self.tree.lf_left(x) + piece.line_feed_cnt;

                if self.tree.right(x) == SENTINEL {
                    // past the last node
                    let line_start_offset = self.get_offset_at(lf_cnt + 1, 1);
                    let column = original_offset - offset - line_start_offset;
                    return Position::new(lf_cnt + 1, column + 1);
                }
                x = self.tree.right(x);
            }
        }

        Position::new(1, 1)
    }

    /// Line index (within the piece) and column of `accumulated` bytes into `node`.
    fn get_index_of(&self, node: NodeId, accumulated: usize) -> (usize, usize) {
        let piece = self.piece(node);
        let pos = self.position_in_buffer(node, accumulated);
        let line_cnt = pos.line - piece.start.line;

        if self.offset_in_buffer(piece.buffer_idx, piece.end)
            - self.offset_in_buffer(piece.buffer_idx, piece.start)
            == accumulated
        {
            // end of the piece: a \r here may be the first half of a \r\n
            let real_line_cnt = self.get_line_feed_cnt(piece.buffer_idx, piece.start, pos);
            if real_line_cnt != line_cnt {
                return (real_line_cnt, 0);
            }
        }

        (line_cnt, pos.column)
    }

    /// Bytes from the start of `node` to the start of its `index + 1`-th line,
    /// or to its end when it has fewer lines. Negative indexes give 0.
    fn get_accumulated_value(&self, node: NodeId, index: isize) -> usize {
        if index < 0 {
            return 0;
        }
        let piece = self.tree.piece(node);
        let line_starts = self.buffers[piece.buffer_idx].line_starts();
        let expected_line_start_index = piece.start.line + index as usize + 1;
        if expected_line_start_index > piece.end.line {
            line_starts[piece.end.line] + piece.end.column
                - line_starts[piece.start.line]
                - piece.start.column
        } else {
            line_starts[expected_line_start_index]
                - line_starts[piece.start.line]
                - piece.start.column
        }
    }

    fn position_in_buffer(&self, node: NodeId, remainder: usize) -> BufferCursor {
        let piece = self.tree.piece(node);
        let line_starts = self.buffers[piece.buffer_idx].line_starts();
        let start_offset = line_starts[piece.start.line] + piece.start.column;
        let offset = start_offset + remainder;

        // binary search for the line containing offset
        let mut low = piece.start.line;
        let mut high = piece.end.line;
        let mut mid = low;
        let mut mid_start = line_starts[mid];

        while low <= high {
            mid = low + (high - low) / 2;
            mid_start = line_starts[mid];

            if mid == high {
                break;
            }

            let mid_stop = line_starts[mid + 1];
            if offset < mid_start {
                high = mid - 1;
            } else if offset >= mid_stop {
                low = mid + 1;
            } else {
                break;
            }
        }

        BufferCursor::new(mid, offset - mid_start)
    }

    /// Line breaks between `start` and `end` in one buffer, counting a `\r`
    /// right before `end` when the buffer continues it with `\n`.
    fn get_line_feed_cnt(&self, buffer_idx: usize, start: BufferCursor, end: BufferCursor) -> usize {
        if end.column == 0 {
            return end.line - start.line;
        }

        let buffer = &self.buffers[buffer_idx];
        let line_starts = buffer.line_starts();
        if end.line == line_starts.len() - 1 {
            // last line of the buffer, no break after end
            return end.line - start.line;
        }

        let next_line_start_offset = line_starts[end.line + 1];
        let end_offset = line_starts[end.line] + end.column;
        if next_line_start_offset > end_offset + 1 {
            // more than one byte before the next line start, so not a \n
            return end.line - start.line;
        }

        // the byte at end_offset is \n; end.column > 0 so end_offset >= 1
        if buffer.byte_at(end_offset - 1) == Some(b'\r') {
            end.line - start.line + 1
        } else {
            end.line - start.line
        }
    }

    // endregion

    // region: node lookup

    /// Node containing `offset`. Piece ends are inclusive.
    fn node_at(&self, offset: usize) -> Option<NodePosition> {
        if let Some(entry) = self.search_cache.borrow().get(offset, &self.tree) {
            return Some(NodePosition {
                node: entry.node,
                remainder: offset - entry.node_start_offset,
                node_start_offset: entry.node_start_offset,
            });
        }

        let mut offset = offset;
        let mut node_start_offset = 0;
        let mut x = self.tree.root();

        while x != SENTINEL {
            let piece = self.piece(x);
            let size_left = self.tree.size_left(x);
            if size_left > offset {
                x = self.tree.left(x);
            } else if size_left + piece.length >= offset {
                node_start_offset += size_left;
                self.search_cache.borrow_mut().set(CacheEntry {
                    node: x,
                    node_start_offset,
                    node_start_line: None,
                });
                return Some(NodePosition {
                    node: x,
                    remainder: offset - size_left,
                    node_start_offset,
                });
            } else {
                offset -= size_left + piece.length;
                node_start_offset += size_left + piece.length;
                x = self.tree.right(x);
            }
        }

        None
    }

    /// Node containing the 1-based `(line_number, column)`.
    fn node_at2(&self, line_number: usize, column: usize) -> Option<NodePosition> {
        let mut line_number = line_number;
        let mut column = column.saturating_sub(1);
        let mut x = self.tree.root();
        let mut node_start_offset = 0;

        while x != SENTINEL {
            let piece = self.piece(x);
            let lf_left = self.tree.lf_left(x);
            let size_left = self.tree.size_left(x);

            if self.tree.left(x) != SENTINEL && lf_left + 1 >= line_number {
                x = self.tree.left(x);
            } else if lf_left + piece.line_feed_cnt + 1 > line_number {
                let prev_accumulated =
                    self.get_accumulated_value(x, line_number as isize - lf_left as isize - 2);
                let accumulated =
                    self.get_accumulated_value(x, line_number as isize - lf_left as isize - 1);
                node_start_offset += size_left;
                return Some(NodePosition {
                    node: x,
                    remainder: (prev_accumulated + column).min(accumulated),
                    node_start_offset,
                });
            } else if lf_left + piece.line_feed_cnt + 1 == line_number {
                let prev_accumulated =
                    self.get_accumulated_value(x, line_number as isize - lf_left as isize - 2);
                if prev_accumulated + column <= piece.length {
                    return Some(NodePosition {
                        node: x,
                        remainder: prev_accumulated + column,
                        node_start_offset: node_start_offset + size_left,
                    });
                }
                column -= piece.length - prev_accumulated;
                break;
            } else {
                line_number -= lf_left + piece.line_feed_cnt;
                node_start_offset += size_left + piece.length;
                x = self.tree.right(x);
            }
        }

        // the column runs past the node holding the line start
        x = self.tree.next(x);
        while x != SENTINEL {
            let piece = self.piece(x);
            if piece.line_feed_cnt > 0 {
                let accumulated = self.get_accumulated_value(x, 0);
                return Some(NodePosition {
                    node: x,
                    remainder: column.min(accumulated),
                    node_start_offset: self.tree.offset_of(x),
                });
            }
            if piece.length >= column {
                return Some(NodePosition {
                    node: x,
                    remainder: column,
                    node_start_offset: self.tree.offset_of(x),
                });
            }
            column -= piece.length;
            x = self.tree.next(x);
        }

        None
    }

    fn node_char_code_at(&self, node: NodeId, offset: usize) -> Option<u8> {
        let piece = self.tree.piece(node);
        if piece.line_feed_cnt < 1 {
            return None;
        }
        let buffer = &self.buffers[piece.buffer_idx];
        buffer.byte_at(buffer.offset_of(piece.start) + offset)
    }

    fn is_char_boundary(&self, offset: usize) -> bool {
        if offset == 0 || offset >= self.length {
            return offset <= self.length;
        }
        let Some(pos) = self.node_at(offset) else {
            return false;
        };
        let piece = self.tree.piece(pos.node);
        let buffer = &self.buffers[piece.buffer_idx];
        buffer
            .as_str()
            .is_char_boundary(buffer.offset_of(piece.start) + pos.remainder)
    }

    // endregion

    // region: content

    /// The whole document.
    pub fn get_text(&self) -> String {
        let mut text = String::with_capacity(self.length);
        for node in self.tree.iter() {
            text.push_str(self.node_content(node));
        }
        text
    }

    /// The whole document, line breaks included.
    pub fn get_lines_raw_content(&self) -> String {
        self.get_text()
    }

    /// Every line without its terminator.
    pub fn get_lines_content(&self) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut current_line = String::new();
        let mut dangling_cr = false;

        for node in self.tree.iter() {
            let mut text = self.node_content(node);

            // Handle dangling CR across piece boundary
            if dangling_cr {
                if let Some(rest) = text.strip_prefix('\n') {
                    text = rest;
                }
                lines.push(mem::take(&mut current_line));
                dangling_cr = false;
            }

            let bytes = text.as_bytes();
            let mut seg_start = 0;
            let mut i = 0;
            while i < bytes.len() {
                match bytes[i] {
                    b'\r' => {
                        current_line.push_str(&text[seg_start..i]);
                        if i + 1 == bytes.len() {
                            // the \n may start the next piece
                            dangling_cr = true;
                        } else {
                            if bytes[i + 1] == b'\n' {
                                i += 1;
                            }
                            lines.push(mem::take(&mut current_line));
                        }
                        seg_start = i + 1;
                    }
                    b'\n' => {
                        current_line.push_str(&text[seg_start..i]);
                        lines.push(mem::take(&mut current_line));
                        seg_start = i + 1;
                    }
                    _ => {}
                }
                i += 1;
            }
            current_line.push_str(&text[seg_start..]);
        }

        if dangling_cr {
            lines.push(mem::take(&mut current_line));
        }

        // push the remaining current line (last line)
        lines.push(current_line);
        lines
    }

    /// Content of a line without its terminator. Memoized for repeated calls.
    pub fn get_line_content(&self, line_number: usize) -> String {
        if let Some((line, value)) = &*self.last_visited_line.borrow() {
            if *line == line_number {
                return value.clone();
            }
        }

        let value = if line_number == self.line_count {
            self.get_line_raw_content(line_number, 0)
        } else if self.eol_normalized {
            self.get_line_raw_content(line_number, self.eol.len())
        } else {
            let mut raw = self.get_line_raw_content(line_number, 0);
            raw.truncate(raw.len() - trailing_eol_len(&raw));
            raw
        };

        *self.last_visited_line.borrow_mut() = Some((line_number, value.clone()));
        value
    }

    /// Content of a line including its terminator, minus `end_offset`
    /// trailing bytes. Out-of-range lines are empty.
    pub fn get_line_raw_content(&self, line_number: usize, end_offset: usize) -> String {
        if line_number == 0 || line_number > self.line_count || self.tree.is_empty() {
            return String::new();
        }

        let mut raw = self.line_raw(line_number);
        let mut cut = raw.len().saturating_sub(end_offset);
        while !raw.is_char_boundary(cut) {
            cut += 1;
        }
        raw.truncate(cut);
        raw
    }

    fn line_raw(&self, line_number: usize) -> String {
        let original_line_number = line_number;
        let mut line_number = line_number;
        let mut x = self.tree.root();
        let mut ret = String::new();

        let cached = self.search_cache.borrow().get_by_line(line_number, &self.tree);
        if let Some(entry) = cached.filter(|e| e.node_start_line.is_some()) {
            let node_start_line = entry.node_start_line.unwrap_or(1);
            x = entry.node;
            let piece = self.piece(x);
            let buffer = &self.buffers[piece.buffer_idx];
            let start_offset = buffer.offset_of(piece.start);
            let prev_accumulated = self.get_accumulated_value(
                x,
                line_number as isize - node_start_line as isize - 1,
            );

            if node_start_line + piece.line_feed_cnt == line_number {
                ret.push_str(
                    &buffer.as_str()[start_offset + prev_accumulated..start_offset + piece.length],
                );
            } else {
                let accumulated =
                    self.get_accumulated_value(x, (line_number - node_start_line) as isize);
                return buffer.as_str()[start_offset + prev_accumulated..start_offset + accumulated]
                    .to_string();
            }
        } else {
            let mut node_start_offset = 0;
            while x != SENTINEL {
                let piece = self.piece(x);
                let lf_left = self.tree.lf_left(x);
                let size_left = self.tree.size_left(x);

                if self.tree.left(x) != SENTINEL && lf_left >= line_number - 1 {
                    x = self.tree.left(x);
                } else if lf_left + piece.line_feed_cnt > line_number - 1 {
                    let prev_accumulated =
                        self.get_accumulated_value(x, line_number as isize - lf_left as isize - 2);
                    let accumulated =
                        self.get_accumulated_value(x, line_number as isize - lf_left as isize - 1);
                    let buffer = &self.buffers[piece.buffer_idx];
                    let start_offset = buffer.offset_of(piece.start);
                    node_start_offset += size_left;
                    self.search_cache.borrow_mut().set(CacheEntry {
                        node: x,
                        node_start_offset,
                        node_start_line: Some(original_line_number - (line_number - 1 - lf_left)),
                    });
                    return buffer.as_str()
                        [start_offset + prev_accumulated..start_offset + accumulated]
                        .to_string();
                } else if lf_left + piece.line_feed_cnt == line_number - 1 {
                    let prev_accumulated =
                        self.get_accumulated_value(x, line_number as isize - lf_left as isize - 2);
                    let buffer = &self.buffers[piece.buffer_idx];
                    let start_offset = buffer.offset_of(piece.start);
                    ret.push_str(
                        &buffer.as_str()
                            [start_offset + prev_accumulated..start_offset + piece.length],
                    );
                    break;
                } else {
                    line_number -= lf_left + piece.line_feed_cnt;
                    node_start_offset += size_left + piece.length;
                    x = self.tree.right(x);
                }
            }
        }

        // the line continues until the first piece holding a break
        x = self.tree.next(x);
        while x != SENTINEL {
            let piece = self.piece(x);
            let buffer = &self.buffers[piece.buffer_idx];
            let start_offset = buffer.offset_of(piece.start);
            if piece.line_feed_cnt > 0 {
                let accumulated = self.get_accumulated_value(x, 0);
                ret.push_str(&buffer.as_str()[start_offset..start_offset + accumulated]);
                return ret;
            }
            ret.push_str(&buffer.as_str()[start_offset..start_offset + piece.length]);
            x = self.tree.next(x);
        }

        ret
    }

    /// Byte length of a line without its terminator.
    pub fn get_line_length(&self, line_number: usize) -> usize {
        if line_number == 0 || line_number > self.line_count {
            return 0;
        }
        if !self.eol_normalized {
            return self.get_line_content(line_number).len();
        }
        if line_number == self.line_count {
            return self.length - self.get_offset_at(line_number, 1);
        }
        self.get_offset_at(line_number + 1, 1) - self.get_offset_at(line_number, 1) - self.eol.len()
    }

    /// Byte at 0-based `index` of a line.
    pub fn get_line_char_code(&self, line_number: usize, index: usize) -> Option<u8> {
        let pos = self.node_at2(line_number, index + 1)?;
        let piece = self.piece(pos.node);

        if pos.remainder == piece.length {
            // the byte is the head of the next node
            let next = self.tree.next(pos.node);
            if next == SENTINEL {
                return None;
            }
            let next_piece = self.piece(next);
            let buffer = &self.buffers[next_piece.buffer_idx];
            return buffer.byte_at(buffer.offset_of(next_piece.start));
        }

        let buffer = &self.buffers[piece.buffer_idx];
        buffer.byte_at(buffer.offset_of(piece.start) + pos.remainder)
    }

    /// Text inside `range`. With `Some(eol)`, line breaks are rewritten to
    /// `eol` unless the content is already known to use it.
    pub fn get_value_in_range(&self, range: &Range, eol: Option<EndOfLine>) -> String {
        if range.is_empty() {
            return String::new();
        }

        let start = self.node_at2(range.start_line, range.start_column);
        let end = self.node_at2(range.end_line, range.end_column);
        let value = match (start, end) {
            (Some(start), Some(end)) => self.get_value_in_range2(start, end),
            _ => {
                let start = self
                    .get_offset_at(range.start_line, range.start_column)
                    .min(self.length);
                let end = self
                    .get_offset_at(range.end_line, range.end_column)
                    .min(self.length);
                self.get_value_in_offsets(start, end)
            }
        };

        match eol {
            Some(eol) if eol != self.eol || !self.eol_normalized => {
                replace_line_breaks(&value, eol.as_str())
            }
            _ => value,
        }
    }

    /// Text between two offsets.
    pub fn get_value_in_offsets(&self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        match (self.node_at(start), self.node_at(end)) {
            (Some(start), Some(end)) => self.get_value_in_range2(start, end),
            _ => String::new(),
        }
    }

    fn get_value_in_range2(&self, start: NodePosition, end: NodePosition) -> String {
        if start.node == end.node {
            let piece = self.piece(start.node);
            let buffer = &self.buffers[piece.buffer_idx];
            let start_offset = buffer.offset_of(piece.start);
            if start.remainder >= end.remainder {
                return String::new();
            }
            return buffer.as_str()[start_offset + start.remainder..start_offset + end.remainder]
                .to_string();
        }

        let mut x = start.node;
        let piece = self.piece(x);
        let buffer = &self.buffers[piece.buffer_idx];
        let start_offset = buffer.offset_of(piece.start);
        let mut ret = buffer.as_str()[start_offset + start.remainder..start_offset + piece.length]
            .to_string();

        x = self.tree.next(x);
        while x != SENTINEL {
            let piece = self.piece(x);
            let buffer = &self.buffers[piece.buffer_idx];
            let start_offset = buffer.offset_of(piece.start);
            if x == end.node {
                ret.push_str(&buffer.as_str()[start_offset..start_offset + end.remainder]);
                break;
            }
            ret.push_str(&buffer.as_str()[start_offset..start_offset + piece.length]);
            x = self.tree.next(x);
        }

        ret
    }

    /// Same length, line count and content.
    pub fn equal(&self, other: &PieceTree) -> bool {
        if self.len() != other.len() || self.line_count() != other.line_count() {
            return false;
        }

        let mut offset = 0;
        for node in self.tree.iter() {
            let text = self.node_content(node);
            let other_text = other.get_value_in_offsets(offset, offset + text.len());
            if text != other_text {
                return false;
            }
            offset += text.len();
        }
        true
    }

    /// Point-in-time content iterator starting with `bom`.
    pub fn create_snapshot(&self, bom: &str) -> PieceTreeSnapshot {
        let pieces = self.tree.iter().map(|node| self.piece(node)).collect();
        PieceTreeSnapshot::new(self.buffers.clone(), pieces, bom.to_string())
    }

    // endregion

    // region: insert / delete

    /// Insert `value` at `offset`. `eol_normalized` claims `value` only
    /// contains line breaks equal to [`PieceTree::eol`].
    pub fn insert(&mut self, offset: usize, value: &str, eol_normalized: bool) {
        if value.is_empty() {
            return;
        }
        debug_assert!(offset <= self.length, "insert offset {offset} out of range");
        debug_assert!(self.is_char_boundary(offset), "insert offset {offset} splits a char");

        let offset = offset.min(self.length);
        self.eol_normalized &= eol_normalized;
        *self.last_visited_line.get_mut() = None;

        if self.tree.is_empty() {
            let pieces = self.create_new_pieces(value);
            let mut node = SENTINEL;
            for piece in pieces {
                node = if node == SENTINEL {
                    self.tree.insert_left(SENTINEL, piece)
                } else {
                    self.tree.insert_right(node, piece)
                };
            }
        } else if let Some(position) = self.node_at(offset) {
            self.insert_at(position, offset, value.to_string());
        }

        self.search_cache.get_mut().validate(offset, &self.tree);
        self.compute_buffer_metadata();
    }

    fn insert_at(&mut self, position: NodePosition, offset: usize, mut value: String) {
        let NodePosition {
            node,
            remainder,
            node_start_offset,
        } = position;
        let piece = self.piece(node);
        let buffer_idx = piece.buffer_idx;
        let insert_pos_in_buffer = self.position_in_buffer(node, remainder);

        if buffer_idx == 0
            && piece.end == self.last_change_buffer_pos
            && node_start_offset + piece.length == offset
            && value.len() < self.config.average_buffer_size()
        {
            // typing at the end of the last append
            self.append_to_node(node, value);
            return;
        }

        if node_start_offset == offset {
            self.insert_content_to_node_left(value, node);
        } else if node_start_offset + piece.length > offset {
            // inserting into the middle of a node
            let mut nodes_to_del = Vec::new();
            let mut new_right_piece = Piece::new(
                buffer_idx,
                insert_pos_in_buffer,
                piece.end,
                self.offset_in_buffer(buffer_idx, piece.end)
                    - self.offset_in_buffer(buffer_idx, insert_pos_in_buffer),
                self.get_line_feed_cnt(buffer_idx, insert_pos_in_buffer, piece.end),
            );

            if self.should_check_crlf()
                && value.ends_with('\r')
                && self.node_char_code_at(node, remainder) == Some(b'\n')
            {
                let new_start = BufferCursor::new(new_right_piece.start.line + 1, 0);
                new_right_piece = Piece::new(
                    buffer_idx,
                    new_start,
                    new_right_piece.end,
                    new_right_piece.length - 1,
                    self.get_line_feed_cnt(buffer_idx, new_start, new_right_piece.end),
                );
                value.push('\n');
            }

            // reuse node for the content before the insertion point
            if self.should_check_crlf()
                && value.starts_with('\n')
                && self.node_char_code_at(node, remainder - 1) == Some(b'\r')
            {
                let previous_pos = self.position_in_buffer(node, remainder - 1);
                self.delete_node_tail(node, previous_pos);
                value.insert(0, '\r');
                if self.tree.piece(node).length == 0 {
                    nodes_to_del.push(node);
                }
            } else {
                self.delete_node_tail(node, insert_pos_in_buffer);
            }

            let new_pieces = self.create_new_pieces(&value);
            if new_right_piece.length > 0 {
                self.tree.insert_right(node, new_right_piece);
            }

            let mut tmp_node = node;
            for piece in new_pieces {
                tmp_node = self.tree.insert_right(tmp_node, piece);
            }
            self.delete_nodes(&nodes_to_del);
        } else {
            self.insert_content_to_node_right(value, node);
        }
    }

    /// Delete `cnt` bytes starting at `offset`.
    pub fn delete(&mut self, offset: usize, cnt: usize) {
        *self.last_visited_line.get_mut() = None;
        if cnt == 0 || self.tree.is_empty() {
            return;
        }
        debug_assert!(offset + cnt <= self.length, "delete range out of bounds");
        debug_assert!(self.is_char_boundary(offset) && self.is_char_boundary(offset + cnt));

        let offset = offset.min(self.length);
        let cnt = cnt.min(self.length - offset);
        if cnt == 0 {
            return;
        }

        if let (Some(start), Some(end)) = (self.node_at(offset), self.node_at(offset + cnt)) {
            self.delete_between(start, end, offset, cnt);
        }

        self.search_cache.get_mut().validate(offset, &self.tree);
        self.compute_buffer_metadata();
    }

    fn delete_between(
        &mut self,
        start_position: NodePosition,
        end_position: NodePosition,
        offset: usize,
        cnt: usize,
    ) {
        let start_node = start_position.node;
        let end_node = end_position.node;

        if start_node == end_node {
            let start_split_pos = self.position_in_buffer(start_node, start_position.remainder);
            let end_split_pos = self.position_in_buffer(start_node, end_position.remainder);
            let piece_length = self.tree.piece(start_node).length;

            if start_position.node_start_offset == offset {
                if cnt == piece_length {
                    let next = self.tree.next(start_node);
                    self.rb_delete(start_node);
                    self.validate_crlf_with_prev_node(next);
                    return;
                }
                self.delete_node_head(start_node, end_split_pos);
                self.validate_crlf_with_prev_node(start_node);
                return;
            }

            if start_position.node_start_offset + piece_length == offset + cnt {
                self.delete_node_tail(start_node, start_split_pos);
                self.validate_crlf_with_next_node(start_node);
                return;
            }

            // the node is split in two around the deleted span
            self.shrink_node(start_node, start_split_pos, end_split_pos);
            return;
        }

        let mut nodes_to_del = Vec::new();

        let start_split_pos = self.position_in_buffer(start_node, start_position.remainder);
        self.delete_node_tail(start_node, start_split_pos);
        if self.tree.piece(start_node).length == 0 {
            nodes_to_del.push(start_node);
        }

        let end_split_pos = self.position_in_buffer(end_node, end_position.remainder);
        self.delete_node_head(end_node, end_split_pos);
        if self.tree.piece(end_node).length == 0 {
            nodes_to_del.push(end_node);
        }

        // nodes fully covered by the deletion
        let mut node = self.tree.next(start_node);
        while node != SENTINEL && node != end_node {
            nodes_to_del.push(node);
            node = self.tree.next(node);
        }

        let prev = if self.tree.piece(start_node).length == 0 {
            self.tree.prev(start_node)
        } else {
            start_node
        };
        self.delete_nodes(&nodes_to_del);
        self.validate_crlf_with_next_node(prev);
    }

    fn insert_content_to_node_left(&mut self, mut value: String, node: NodeId) {
        let mut nodes_to_del = Vec::new();

        if self.should_check_crlf() && value.ends_with('\r') && self.start_with_lf(node) {
            // move the \n into the new text
            let piece = self.piece(node);
            let new_start = BufferCursor::new(piece.start.line + 1, 0);
            let line_feed_cnt = self.get_line_feed_cnt(piece.buffer_idx, new_start, piece.end);
            self.tree.set_piece(
                node,
                Piece::new(piece.buffer_idx, new_start, piece.end, piece.length - 1, line_feed_cnt),
            );
            value.push('\n');
            self.tree.update_metadata(
                node,
                -1,
                line_feed_cnt as isize - piece.line_feed_cnt as isize,
            );

            if piece.length == 1 {
                nodes_to_del.push(node);
            }
        }

        let new_pieces = self.create_new_pieces(&value);
        let mut new_node = node;
        for piece in new_pieces.into_iter().rev() {
            new_node = self.tree.insert_left(new_node, piece);
        }
        self.validate_crlf_with_prev_node(new_node);
        self.delete_nodes(&nodes_to_del);
    }

    fn insert_content_to_node_right(&mut self, mut value: String, node: NodeId) {
        if self.adjust_carriage_return_from_next(&value, node) {
            value.push('\n');
        }

        let mut new_pieces = self.create_new_pieces(&value).into_iter();
        let Some(first) = new_pieces.next() else {
            return;
        };
        let new_node = self.tree.insert_right(node, first);
        let mut tmp_node = new_node;
        for piece in new_pieces {
            tmp_node = self.tree.insert_right(tmp_node, piece);
        }
        self.validate_crlf_with_prev_node(new_node);
    }

    /// Strip a leading `\n` from the node after `node` when `value` ends
    /// with `\r`. Returns whether the caller must append the `\n`.
    fn adjust_carriage_return_from_next(&mut self, value: &str, node: NodeId) -> bool {
        if !(self.should_check_crlf() && value.ends_with('\r')) {
            return false;
        }

        let next = self.tree.next(node);
        if !self.start_with_lf(next) {
            return false;
        }

        let piece = self.piece(next);
        if piece.length == 1 {
            self.rb_delete(next);
        } else {
            let new_start = BufferCursor::new(piece.start.line + 1, 0);
            let line_feed_cnt = self.get_line_feed_cnt(piece.buffer_idx, new_start, piece.end);
            self.tree.set_piece(
                next,
                Piece::new(piece.buffer_idx, new_start, piece.end, piece.length - 1, line_feed_cnt),
            );
            self.tree.update_metadata(
                next,
                -1,
                line_feed_cnt as isize - piece.line_feed_cnt as isize,
            );
        }
        true
    }

    fn append_to_node(&mut self, node: NodeId, mut value: String) {
        if self.adjust_carriage_return_from_next(&value, node) {
            value.push('\n');
        }

        let add_buffer = Arc::make_mut(&mut self.buffers[0]);
        let hit_crlf = value.starts_with('\n') && add_buffer.ends_with_cr();
        let start_offset = add_buffer.buffer.len();
        add_buffer.buffer.push_str(&value);

        let line_starts = create_line_starts(&value);
        if hit_crlf {
            // the trailing \r and the new \n are one break
            add_buffer.line_starts.pop();
        }
        add_buffer
            .line_starts
            .extend(line_starts.iter().skip(1).map(|start| start + start_offset));

        let end_index = add_buffer.line_starts.len() - 1;
        let end_column = add_buffer.buffer.len() - add_buffer.line_starts[end_index];
        let new_end = BufferCursor::new(end_index, end_column);

        let piece = self.piece(node);
        let new_length = piece.length + value.len();
        let new_line_feed_cnt = self.get_line_feed_cnt(0, piece.start, new_end);
        let lf_delta = new_line_feed_cnt as isize - piece.line_feed_cnt as isize;

        self.tree.set_piece(
            node,
            Piece::new(0, piece.start, new_end, new_length, new_line_feed_cnt),
        );
        self.last_change_buffer_pos = new_end;
        self.tree.update_metadata(node, value.len() as isize, lf_delta);
    }

    /// Turn `text` into pieces: small texts go to the add buffer, large ones
    /// become their own chunk buffers.
    fn create_new_pieces(&mut self, text: &str) -> Vec<Piece> {
        let average_buffer_size = self.config.average_buffer_size();
        if text.len() > average_buffer_size {
            let mut new_pieces = Vec::new();
            let mut rest = text;
            while rest.len() > average_buffer_size {
                let split = chunk_split_point(rest, average_buffer_size);
                let (chunk, tail) = rest.split_at(split);
                new_pieces.push(self.push_chunk_buffer(chunk));
                rest = tail;
            }
            if !rest.is_empty() {
                new_pieces.push(self.push_chunk_buffer(rest));
            }
            trace!(
                length = text.len(),
                chunks = new_pieces.len(),
                "split large insert into chunk buffers"
            );
            return new_pieces;
        }

        let add_buffer = Arc::make_mut(&mut self.buffers[0]);
        let mut start_offset = add_buffer.buffer.len();
        let line_starts = create_line_starts(text);
        let mut start = self.last_change_buffer_pos;

        if add_buffer.line_starts.last() == Some(&start_offset)
            && start_offset != 0
            && text.starts_with('\n')
            && add_buffer.ends_with_cr()
        {
            // pad so the stored \r and the new \n stay separate breaks
            self.last_change_buffer_pos =
                BufferCursor::new(start.line, start.column + 1);
            start = self.last_change_buffer_pos;
            add_buffer
                .line_starts
                .extend(line_starts.iter().skip(1).map(|s| s + start_offset + 1));
            add_buffer.buffer.push('_');
            add_buffer.buffer.push_str(text);
            start_offset += 1;
        } else {
            add_buffer
                .line_starts
                .extend(line_starts.iter().skip(1).map(|s| s + start_offset));
            add_buffer.buffer.push_str(text);
        }

        let end_offset = add_buffer.buffer.len();
        let end_index = add_buffer.line_starts.len() - 1;
        let end_column = end_offset - add_buffer.line_starts[end_index];
        let end_pos = BufferCursor::new(end_index, end_column);

        let line_feed_cnt = self.get_line_feed_cnt(0, start, end_pos);
        let new_piece = Piece::new(0, start, end_pos, end_offset - start_offset, line_feed_cnt);
        self.last_change_buffer_pos = end_pos;
        vec![new_piece]
    }

    fn push_chunk_buffer(&mut self, text: &str) -> Piece {
        let line_starts = create_line_starts(text);
        let last_line = line_starts.len() - 1;
        let piece = Piece::new(
            self.buffers.len(),
            BufferCursor::new(0, 0),
            BufferCursor::new(last_line, text.len() - line_starts[last_line]),
            text.len(),
            last_line,
        );
        self.buffers.push(Arc::new(StringBuffer::with_line_starts(
            text.to_string(),
            line_starts,
        )));
        piece
    }

    fn delete_node_tail(&mut self, node: NodeId, pos: BufferCursor) {
        let piece = self.piece(node);
        let original_end_offset = self.offset_in_buffer(piece.buffer_idx, piece.end);
        let new_end_offset = self.offset_in_buffer(piece.buffer_idx, pos);
        let new_line_feed_cnt = self.get_line_feed_cnt(piece.buffer_idx, piece.start, pos);

        let lf_delta = new_line_feed_cnt as isize - piece.line_feed_cnt as isize;
        let size_delta = new_end_offset as isize - original_end_offset as isize;
        let new_length = piece.length - (original_end_offset - new_end_offset);

        self.tree.set_piece(
            node,
            Piece::new(piece.buffer_idx, piece.start, pos, new_length, new_line_feed_cnt),
        );
        self.tree.update_metadata(node, size_delta, lf_delta);
    }

    fn delete_node_head(&mut self, node: NodeId, pos: BufferCursor) {
        let piece = self.piece(node);
        let original_start_offset = self.offset_in_buffer(piece.buffer_idx, piece.start);
        let new_start_offset = self.offset_in_buffer(piece.buffer_idx, pos);
        let new_line_feed_cnt = self.get_line_feed_cnt(piece.buffer_idx, pos, piece.end);

        let lf_delta = new_line_feed_cnt as isize - piece.line_feed_cnt as isize;
        let size_delta = original_start_offset as isize - new_start_offset as isize;
        let new_length = piece.length - (new_start_offset - original_start_offset);

        self.tree.set_piece(
            node,
            Piece::new(piece.buffer_idx, pos, piece.end, new_length, new_line_feed_cnt),
        );
        self.tree.update_metadata(node, size_delta, lf_delta);
    }

    /// Keep `[piece.start, start)` in `node` and move `[end, piece.end)` into
    /// a new node after it.
    fn shrink_node(&mut self, node: NodeId, start: BufferCursor, end: BufferCursor) {
        let piece = self.piece(node);
        let original_start_pos = piece.start;
        let original_end_pos = piece.end;

        let new_line_feed_cnt = self.get_line_feed_cnt(piece.buffer_idx, piece.start, start);
        let new_length = self.offset_in_buffer(piece.buffer_idx, start)
            - self.offset_in_buffer(piece.buffer_idx, original_start_pos);
        self.tree.set_piece(
            node,
            Piece::new(piece.buffer_idx, piece.start, start, new_length, new_line_feed_cnt),
        );
        self.tree.update_metadata(
            node,
            new_length as isize - piece.length as isize,
            new_line_feed_cnt as isize - piece.line_feed_cnt as isize,
        );

        let new_piece = Piece::new(
            piece.buffer_idx,
            end,
            original_end_pos,
            self.offset_in_buffer(piece.buffer_idx, original_end_pos)
                - self.offset_in_buffer(piece.buffer_idx, end),
            self.get_line_feed_cnt(piece.buffer_idx, end, original_end_pos),
        );
        let new_node = self.tree.insert_right(node, new_piece);
        self.validate_crlf_with_prev_node(new_node);
    }

    fn rb_delete(&mut self, node: NodeId) {
        self.search_cache.get_mut().forget(node);
        self.tree.delete(node);
    }

    fn delete_nodes(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            self.rb_delete(node);
        }
    }

    fn compute_buffer_metadata(&mut self) {
        let mut x = self.tree.root();
        let mut lf_cnt = 1;
        let mut len = 0;

        while x != SENTINEL {
            let piece = self.tree.piece(x);
            lf_cnt += self.tree.lf_left(x) + piece.line_feed_cnt;
            len += self.tree.size_left(x) + piece.length;
            x = self.tree.right(x);
        }

        self.line_count = lf_cnt;
        self.length = len;
        self.search_cache.get_mut().validate(self.length, &self.tree);
    }

    // endregion

    // region: CRLF

    fn start_with_lf(&self, node: NodeId) -> bool {
        if node == SENTINEL {
            return false;
        }
        let piece = self.tree.piece(node);
        if piece.line_feed_cnt == 0 {
            return false;
        }

        let buffer = &self.buffers[piece.buffer_idx];
        let line_starts = buffer.line_starts();
        let line = piece.start.line;
        let start_offset = line_starts[line] + piece.start.column;
        if line == line_starts.len() - 1 {
            // last line, so no line break at the end
            return false;
        }
        if line_starts[line + 1] > start_offset + 1 {
            return false;
        }
        buffer.byte_at(start_offset) == Some(b'\n')
    }

    fn end_with_cr(&self, node: NodeId) -> bool {
        if node == SENTINEL || self.tree.piece(node).line_feed_cnt == 0 {
            return false;
        }
        let length = self.tree.piece(node).length;
        self.node_char_code_at(node, length - 1) == Some(b'\r')
    }

    fn validate_crlf_with_prev_node(&mut self, next: NodeId) {
        if self.should_check_crlf() && self.start_with_lf(next) {
            let node = self.tree.prev(next);
            if self.end_with_cr(node) {
                self.fix_crlf(node, next);
            }
        }
    }

    fn validate_crlf_with_next_node(&mut self, node: NodeId) {
        if self.should_check_crlf() && self.end_with_cr(node) {
            let next = self.tree.next(node);
            if self.start_with_lf(next) {
                self.fix_crlf(node, next);
            }
        }
    }

    /// `prev` ends with `\r` and `next` starts with `\n`: move both into a
    /// fresh `\r\n` piece between them.
    fn fix_crlf(&mut self, prev: NodeId, next: NodeId) {
        let mut nodes_to_del = Vec::new();

        let prev_piece = self.piece(prev);
        let line_starts = self.buffers[prev_piece.buffer_idx].line_starts();
        let new_end = if prev_piece.end.column == 0 {
            // the piece ends with a lone \r
            BufferCursor::new(
                prev_piece.end.line - 1,
                line_starts[prev_piece.end.line] - line_starts[prev_piece.end.line - 1] - 1,
            )
        } else {
            // \r\n split inside one buffer
            BufferCursor::new(prev_piece.end.line, prev_piece.end.column - 1)
        };
        let prev_line_feed_cnt =
            self.get_line_feed_cnt(prev_piece.buffer_idx, prev_piece.start, new_end);
        self.tree.set_piece(
            prev,
            Piece::new(
                prev_piece.buffer_idx,
                prev_piece.start,
                new_end,
                prev_piece.length - 1,
                prev_line_feed_cnt,
            ),
        );
        self.tree.update_metadata(
            prev,
            -1,
            prev_line_feed_cnt as isize - prev_piece.line_feed_cnt as isize,
        );
        if prev_piece.length == 1 {
            nodes_to_del.push(prev);
        }

        let next_piece = self.piece(next);
        let new_start = BufferCursor::new(next_piece.start.line + 1, 0);
        let next_line_feed_cnt =
            self.get_line_feed_cnt(next_piece.buffer_idx, new_start, next_piece.end);
        self.tree.set_piece(
            next,
            Piece::new(
                next_piece.buffer_idx,
                new_start,
                next_piece.end,
                next_piece.length - 1,
                next_line_feed_cnt,
            ),
        );
        self.tree.update_metadata(
            next,
            -1,
            next_line_feed_cnt as isize - next_piece.line_feed_cnt as isize,
        );
        if next_piece.length == 1 {
            nodes_to_del.push(next);
        }

        let mut tmp_node = prev;
        for piece in self.create_new_pieces("\r\n") {
            tmp_node = self.tree.insert_right(tmp_node, piece);
        }
        self.delete_nodes(&nodes_to_del);
    }

    // endregion

    /// Verify tree shape, both aggregates, every piece against its buffer,
    /// and the cached totals.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.tree.check_invariants()?;

        let mut length = 0;
        let mut line_feeds = 0;
        for node in self.tree.iter() {
            let piece = self.piece(node);
            if piece.length == 0 {
                return Err(format!("empty piece {piece:?}"));
            }
            let span = self.offset_in_buffer(piece.buffer_idx, piece.end)
                - self.offset_in_buffer(piece.buffer_idx, piece.start);
            if span != piece.length {
                return Err(format!("piece {piece:?} spans {span} bytes"));
            }
            let line_feed_cnt = self.get_line_feed_cnt(piece.buffer_idx, piece.start, piece.end);
            if line_feed_cnt != piece.line_feed_cnt {
                return Err(format!("piece {piece:?} holds {line_feed_cnt} line breaks"));
            }
            length += piece.length;
            line_feeds += piece.line_feed_cnt;
        }

        if length != self.length {
            return Err(format!("cached length {} but pieces hold {length}", self.length));
        }
        if line_feeds + 1 != self.line_count {
            return Err(format!(
                "cached line count {} but pieces hold {} breaks",
                self.line_count, line_feeds
            ));
        }

        let add_buffer = &self.buffers[0];
        let last_line = add_buffer.line_starts().len() - 1;
        let add_buffer_end =
            BufferCursor::new(last_line, add_buffer.len() - add_buffer.line_starts()[last_line]);
        if self.last_change_buffer_pos != add_buffer_end {
            return Err(format!(
                "last change {:?} is not the add buffer end {add_buffer_end:?}",
                self.last_change_buffer_pos
            ));
        }
        Ok(())
    }
}

/// Byte length of a single trailing `\r\n`, `\n` or `\r`.
fn trailing_eol_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.ends_with(b"\r\n") {
        2
    } else if matches!(bytes.last(), Some(b'\n' | b'\r')) {
        1
    } else {
        0
    }
}

/// Where to cut the head of an oversized insert. Never splits a char, never
/// ends a chunk with `\r`, and always makes progress.
fn chunk_split_point(text: &str, average_buffer_size: usize) -> usize {
    let bytes = text.as_bytes();
    let mut split = average_buffer_size;
    if bytes[split - 1] == b'\r' {
        split -= 1;
    }
    while !text.is_char_boundary(split) {
        split -= 1;
    }
    if split > 0 {
        return split;
    }

    if text.starts_with("\r\n") {
        return 2;
    }
    text.char_indices()
        .nth(1)
        .map_or(text.len(), |(index, _)| index)
}
