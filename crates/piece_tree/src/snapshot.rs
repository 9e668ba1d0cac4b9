use std::sync::Arc;

use crate::buffer::StringBuffer;
use crate::piece::Piece;

/// Read-once view of a document as it was when the snapshot was taken.
///
/// Yields the BOM followed by the first piece, then one item per remaining
/// piece. The buffers are shared with the tree; the tree copies its add
/// buffer before writing to it while a snapshot still holds a reference.
#[derive(Debug, Clone)]
pub struct PieceTreeSnapshot {
    buffers: Vec<Arc<StringBuffer>>,
    pieces: Vec<Piece>,
    bom: String,
    index: usize,
}

impl PieceTreeSnapshot {
    pub(crate) fn new(buffers: Vec<Arc<StringBuffer>>, pieces: Vec<Piece>, bom: String) -> Self {
        Self {
            buffers,
            pieces,
            bom,
            index: 0,
        }
    }

    /// Next chunk of content, `None` once exhausted.
    pub fn read(&mut self) -> Option<String> {
        self.next()
    }

    fn piece_text(&self, piece: &Piece) -> &str {
        self.buffers[piece.buffer_idx].piece_text(piece)
    }
}

impl Iterator for PieceTreeSnapshot {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.pieces.is_empty() {
            if self.index == 0 {
                self.index += 1;
                return Some(self.bom.clone());
            }
            return None;
        }

        let piece = self.pieces.get(self.index)?;
        let text = self.piece_text(piece);
        let chunk = if self.index == 0 {
            let mut chunk = String::with_capacity(self.bom.len() + text.len());
            chunk.push_str(&self.bom);
            chunk.push_str(text);
            chunk
        } else {
            text.to_string()
        };
        self.index += 1;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::BufferCursor;

    fn whole(buffer_idx: usize, text: &str) -> Piece {
        let len = text.len();
        Piece::new(buffer_idx, BufferCursor::new(0, 0), BufferCursor::new(0, len), len, 0)
    }

    #[test]
    fn empty_snapshot_yields_bom_once() {
        let mut snapshot = PieceTreeSnapshot::new(Vec::new(), Vec::new(), "\u{feff}".to_string());
        assert_eq!(snapshot.read().as_deref(), Some("\u{feff}"));
        assert_eq!(snapshot.read(), None);
    }

    #[test]
    fn bom_prefixes_first_piece_only() {
        let buffers = vec![
            Arc::new(StringBuffer::default()),
            Arc::new(StringBuffer::new("abc".to_string())),
            Arc::new(StringBuffer::new("def".to_string())),
        ];
        let pieces = vec![whole(1, "abc"), whole(2, "def")];
        let snapshot = PieceTreeSnapshot::new(buffers, pieces, "#".to_string());
        assert_eq!(snapshot.collect::<Vec<_>>(), vec!["#abc", "def"]);
    }
}
