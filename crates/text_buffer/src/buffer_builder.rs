use piece_tree::{
    EndOfLine, LineStarts, PieceTree, PieceTreeConfig, StringBuffer, replace_line_breaks,
};
use tracing::debug;

use crate::buffer::TextBuffer;
use crate::strings::contains_rtl;

const UTF8_BOM: char = '\u{feff}';

/// Collects text chunks for a [`TextBuffer`], counting line endings as it
/// goes.
///
/// A chunk ending in `\r` has that byte held back until the next chunk
/// arrives, so a `\r\n` pair never straddles two chunks.
#[derive(Debug)]
pub struct TextBufferBuilder {
    chunks: Vec<StringBuffer>,
    bom: String,
    started: bool,
    has_previous_cr: bool,
    cr: usize,
    lf: usize,
    crlf: usize,
    contains_rtl: bool,
    is_basic_ascii: bool,
}

impl Default for TextBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBufferBuilder {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            bom: String::new(),
            started: false,
            has_previous_cr: false,
            cr: 0,
            lf: 0,
            crlf: 0,
            contains_rtl: false,
            is_basic_ascii: true,
        }
    }

    /// Accept a chunk of text (may include multiple lines).
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }

        let mut chunk = chunk;
        if !self.started {
            self.started = true;
            if let Some(rest) = chunk.strip_prefix(UTF8_BOM) {
                self.bom.push(UTF8_BOM);
                chunk = rest;
            }
        }

        if let Some(body) = chunk.strip_suffix('\r') {
            // a held \r followed by another \r is a break of its own
            self.accept_chunk1(body, self.has_previous_cr);
            self.has_previous_cr = true;
        } else {
            self.accept_chunk1(chunk, false);
        }
    }

    fn accept_chunk1(&mut self, chunk: &str, allow_empty: bool) {
        if !allow_empty && chunk.is_empty() {
            return;
        }

        if self.has_previous_cr {
            self.has_previous_cr = false;
            let mut text = String::with_capacity(chunk.len() + 1);
            text.push('\r');
            text.push_str(chunk);
            self.accept_chunk2(text);
        } else {
            self.accept_chunk2(chunk.to_string());
        }
    }

    fn accept_chunk2(&mut self, chunk: String) {
        let scan = LineStarts::scan(&chunk);
        self.cr += scan.cr;
        self.lf += scan.lf;
        self.crlf += scan.crlf;
        if !scan.is_basic_ascii {
            self.is_basic_ascii = false;
            if !self.contains_rtl {
                self.contains_rtl = contains_rtl(&chunk);
            }
        }
        self.chunks
            .push(StringBuffer::with_line_starts(chunk, scan.line_starts));
    }

    /// Flush the held `\r` and hand the chunks to a factory.
    pub fn finish(mut self, normalize_eol: bool) -> TextBufferFactory {
        if self.chunks.is_empty() {
            self.accept_chunk1("", true);
        }

        if self.has_previous_cr {
            self.has_previous_cr = false;
            if let Some(last) = self.chunks.last_mut() {
                let mut text = last.as_str().to_string();
                text.push('\r');
                *last = StringBuffer::new(text);
            }
            self.cr += 1;
        }

        TextBufferFactory {
            chunks: self.chunks,
            bom: self.bom,
            cr: self.cr,
            lf: self.lf,
            crlf: self.crlf,
            normalize_eol,
            config: PieceTreeConfig::default(),
            contains_rtl: self.contains_rtl,
            is_basic_ascii: self.is_basic_ascii,
        }
    }
}

/// Chunks and line ending counts ready to become a [`TextBuffer`].
#[derive(Debug, Clone)]
pub struct TextBufferFactory {
    chunks: Vec<StringBuffer>,
    bom: String,
    cr: usize,
    lf: usize,
    crlf: usize,
    normalize_eol: bool,
    config: PieceTreeConfig,
    contains_rtl: bool,
    is_basic_ascii: bool,
}

impl TextBufferFactory {
    /// Tunables for the tree [`TextBufferFactory::create`] builds.
    pub fn with_config(mut self, config: PieceTreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Size the position cache of the built tree.
    pub fn with_search_cache_limit(mut self, limit: usize) -> Self {
        self.config = self.config.with_search_cache_limit(limit);
        self
    }

    /// `\r\n` when more than half of the breaks carry a `\r`, `\n` otherwise,
    /// `default` when there are no breaks.
    pub fn get_eol(&self, default: EndOfLine) -> EndOfLine {
        let total_eol_count = self.cr + self.lf + self.crlf;
        let total_cr_count = self.cr + self.crlf;
        if total_eol_count == 0 {
            return default;
        }
        if total_cr_count > total_eol_count / 2 {
            return EndOfLine::CrLf;
        }
        EndOfLine::Lf
    }

    pub fn create(self, default: EndOfLine) -> TextBuffer {
        let eol = self.get_eol(default);
        let mut chunks = self.chunks;

        let mixed = match eol {
            EndOfLine::CrLf => self.cr > 0 || self.lf > 0,
            EndOfLine::Lf => self.cr > 0 || self.crlf > 0,
        };
        if self.normalize_eol && mixed {
            debug!(eol = %eol, chunks = chunks.len(), "normalizing line endings on load");
            for chunk in &mut chunks {
                *chunk = StringBuffer::new(replace_line_breaks(chunk.as_str(), eol.as_str()));
            }
        }

        let tree = PieceTree::with_config(chunks, eol, self.normalize_eol, self.config);
        TextBuffer::new(tree, self.bom, self.contains_rtl, self.is_basic_ascii)
    }

    /// Start of the first line, at most `limit` bytes.
    pub fn get_first_line_text(&self, limit: usize) -> String {
        let Some(first) = self.chunks.first() else {
            return String::new();
        };
        let text = first.as_str();
        let mut end = limit.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let head = &text[..end];
        let line_end = head.find(['\r', '\n']).unwrap_or(head.len());
        head[..line_end].to_string()
    }
}
