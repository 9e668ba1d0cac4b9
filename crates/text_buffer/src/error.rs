use std::io;

use piece_tree::Range;
use thiserror::Error;

/// Errors surfaced by [`TextBuffer`](crate::TextBuffer) and file loading.
#[derive(Error, Debug)]
pub enum TextBufferError {
    /// Two edits of one batch cover the same text. Nothing was applied.
    #[error("overlapping ranges in edit batch: {previous} and {next}")]
    OverlappingRanges { previous: Range, next: Range },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TextBufferError>;
