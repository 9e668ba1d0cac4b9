mod apply_edits;
mod buffer;
mod buffer_builder;
mod edit_operation;
mod error;
mod io;
mod strings;

pub use crate::buffer::{EndOfLinePreference, TextBuffer};
pub use crate::buffer_builder::{TextBufferBuilder, TextBufferFactory};
pub use crate::edit_operation::{
    ApplyEditsResult, ContentChange, EditIdentifier, ReverseSingleEditOperation,
    SingleEditOperation, ValidatedEditOperation,
};
pub use crate::error::{Result, TextBufferError};
pub use crate::io::load_from_path;
pub use crate::strings::{
    contains_rtl, first_non_whitespace_index, is_basic_ascii, last_non_whitespace_index,
};

pub use piece_tree::{EndOfLine, Position, Range};
