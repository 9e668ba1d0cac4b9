use piece_tree::{Position, Range};

/// Caller supplied tag carried from an edit to its reverse edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditIdentifier {
    pub major: usize,
    pub minor: usize,
}

/// One `(range, replacement)` edit of a batch.
///
/// An empty `range` inserts; a `None` or empty `text` deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleEditOperation {
    pub identifier: Option<EditIdentifier>,
    pub range: Range,
    pub text: Option<String>,
    /// The edit has "insert" semantics for markers at its boundaries.
    pub force_move_markers: bool,
    /// The edit inserts automatic indentation that a later edit may trim.
    pub is_auto_whitespace_edit: bool,
    /// Part of a tracked set; the batch must not be collapsed.
    pub is_tracked: bool,
    /// Insert `text` byte for byte instead of converting its line breaks to
    /// the buffer's end of line. Set on edits built from reverse edits.
    pub preserve_line_breaks: bool,
}

impl SingleEditOperation {
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            identifier: None,
            range,
            text: Some(text.into()),
            force_move_markers: false,
            is_auto_whitespace_edit: false,
            is_tracked: false,
            preserve_line_breaks: false,
        }
    }

    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        Self::replace(Range::collapsed(position), text)
    }

    pub fn delete(range: Range) -> Self {
        Self {
            text: None,
            ..Self::replace(range, String::new())
        }
    }

    pub fn with_identifier(mut self, identifier: EditIdentifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn auto_whitespace(mut self) -> Self {
        self.is_auto_whitespace_edit = true;
        self
    }

    pub fn tracked(mut self) -> Self {
        self.is_tracked = true;
        self
    }

    pub fn force_move_markers(mut self) -> Self {
        self.force_move_markers = true;
        self
    }

    pub fn preserve_line_breaks(mut self) -> Self {
        self.preserve_line_breaks = true;
        self
    }
}

/// An edit resolved against the current document.
///
/// `text` already uses the buffer's end of line, and the line statistics
/// describe that normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEditOperation {
    /// Position in the submitted batch.
    pub sort_index: usize,
    pub identifier: Option<EditIdentifier>,
    pub range: Range,
    pub range_offset: usize,
    pub range_length: usize,
    pub text: String,
    pub eol_count: usize,
    pub first_line_length: usize,
    pub last_line_length: usize,
    pub force_move_markers: bool,
    pub is_auto_whitespace_edit: bool,
}

/// The edit that undoes one applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseSingleEditOperation {
    pub sort_index: usize,
    pub identifier: Option<EditIdentifier>,
    /// Where the applied replacement now sits.
    pub range: Range,
    /// The text the replacement overwrote, with its original line breaks.
    pub text: String,
    pub force_move_markers: bool,
}

impl From<ReverseSingleEditOperation> for SingleEditOperation {
    fn from(reverse: ReverseSingleEditOperation) -> Self {
        Self {
            identifier: reverse.identifier,
            range: reverse.range,
            text: Some(reverse.text),
            force_move_markers: reverse.force_move_markers,
            is_auto_whitespace_edit: false,
            is_tracked: false,
            preserve_line_breaks: true,
        }
    }
}

/// One applied edit, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// The replaced range, in coordinates from before the batch.
    pub range: Range,
    pub range_offset: usize,
    pub range_length: usize,
    pub text: String,
    pub force_move_markers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyEditsResult {
    /// Applying these as one batch restores the previous document byte for
    /// byte, mixed line endings included.
    pub reverse_edits: Vec<ReverseSingleEditOperation>,
    pub changes: Vec<ContentChange>,
    /// Lines left holding only auto-inserted whitespace, descending. `None`
    /// unless recording was requested and an auto-whitespace edit ran.
    pub trim_auto_whitespace_line_numbers: Option<Vec<usize>>,
}
