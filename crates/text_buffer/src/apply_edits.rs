use piece_tree::{Range, replace_line_breaks};
use tracing::{debug, trace};

use crate::buffer::{EndOfLinePreference, TextBuffer};
use crate::edit_operation::{
    ApplyEditsResult, ContentChange, EditIdentifier, ReverseSingleEditOperation,
    SingleEditOperation, ValidatedEditOperation,
};
use crate::error::{Result, TextBufferError};
use crate::strings::{
    contains_rtl, count_eol, first_non_whitespace_index, is_basic_ascii, uses_only_eol,
};

/// Batches larger than this are collapsed into one edit unless tracked.
const REDUCE_THRESHOLD: usize = 1000;

struct TrimCandidate {
    line_number: usize,
    old_content: String,
}

impl TextBuffer {
    /// Apply a batch of edits as one transaction.
    ///
    /// Ranges are in coordinates of the document before the batch. Fails
    /// without touching the document when two ranges overlap.
    pub fn apply_edits(
        &mut self,
        raw_operations: Vec<SingleEditOperation>,
        record_trim_auto_whitespace: bool,
    ) -> Result<ApplyEditsResult> {
        let mut might_contain_rtl = self.might_contain_rtl;
        let mut might_contain_non_basic_ascii = self.might_contain_non_basic_ascii;
        let mut can_reduce_operations = true;

        let mut operations = Vec::with_capacity(raw_operations.len());
        for (sort_index, op) in raw_operations.into_iter().enumerate() {
            if op.is_tracked {
                can_reduce_operations = false;
            }
            let text = op.text.unwrap_or_default();
            if !text.is_empty() {
                if !might_contain_rtl {
                    might_contain_rtl = contains_rtl(&text);
                }
                if !might_contain_non_basic_ascii {
                    might_contain_non_basic_ascii = !is_basic_ascii(&text);
                }
            }
            let range = self.validate_range(op.range);
            let text = if op.preserve_line_breaks {
                text
            } else {
                self.normalize_text(text)
            };
            operations.push(self.validated_operation(
                sort_index,
                op.identifier,
                range,
                text,
                op.force_move_markers,
                op.is_auto_whitespace_edit,
            ));
        }

        operations.sort_by(|a, b| {
            Range::compare_using_ends(&a.range, &b.range).then(a.sort_index.cmp(&b.sort_index))
        });

        let mut has_touching_ranges = false;
        for pair in operations.windows(2) {
            let range_end = pair[0].range.end();
            let next_range_start = pair[1].range.start();
            if next_range_start.is_before_or_equal(&range_end) {
                if next_range_start.is_before(&range_end) {
                    debug!(
                        previous = %pair[0].range,
                        next = %pair[1].range,
                        "rejecting edit batch with overlapping ranges"
                    );
                    return Err(TextBufferError::OverlappingRanges {
                        previous: pair[0].range,
                        next: pair[1].range,
                    });
                }
                has_touching_ranges = true;
            }
        }

        if can_reduce_operations && operations.len() > REDUCE_THRESHOLD {
            debug!(operations = operations.len(), "collapsing edit batch into one edit");
            operations = vec![self.to_single_edit_operation(&operations)];
        }

        let reverse_ranges = get_inverse_edit_ranges(&operations);

        let mut trim_candidates = Vec::new();
        if record_trim_auto_whitespace {
            for (op, reverse_range) in operations.iter().zip(&reverse_ranges) {
                if !(op.is_auto_whitespace_edit && op.range.is_empty()) {
                    continue;
                }
                // lines that may hold nothing but the inserted whitespace
                for line_number in reverse_range.start_line..=reverse_range.end_line {
                    let mut old_content = String::new();
                    if line_number == reverse_range.start_line {
                        old_content = self.get_line_content(op.range.start_line);
                        if first_non_whitespace_index(&old_content).is_some() {
                            continue;
                        }
                    }
                    trim_candidates.push(TrimCandidate {
                        line_number,
                        old_content,
                    });
                }
            }
        }

        let mut reverse_edits: Vec<ReverseSingleEditOperation> = operations
            .iter()
            .zip(&reverse_ranges)
            .map(|(op, reverse_range)| ReverseSingleEditOperation {
                sort_index: op.sort_index,
                identifier: op.identifier,
                range: *reverse_range,
                text: self.raw_value_in_range(&op.range),
                force_move_markers: op.force_move_markers,
            })
            .collect();

        // order only matters when edits touch
        if !has_touching_ranges {
            reverse_edits.sort_by_key(|op| op.sort_index);
        }

        self.might_contain_rtl = might_contain_rtl;
        self.might_contain_non_basic_ascii = might_contain_non_basic_ascii;

        let changes = self.do_apply_edits(operations);

        let trim_auto_whitespace_line_numbers =
            if record_trim_auto_whitespace && !trim_candidates.is_empty() {
                Some(self.trim_line_numbers(trim_candidates))
            } else {
                None
            };

        Ok(ApplyEditsResult {
            reverse_edits,
            changes,
            trim_auto_whitespace_line_numbers,
        })
    }

    fn validated_operation(
        &self,
        sort_index: usize,
        identifier: Option<EditIdentifier>,
        range: Range,
        text: String,
        force_move_markers: bool,
        is_auto_whitespace_edit: bool,
    ) -> ValidatedEditOperation {
        let counts = count_eol(&text);
        ValidatedEditOperation {
            sort_index,
            identifier,
            range,
            range_offset: self.get_offset_at(range.start_line, range.start_column),
            range_length: self.get_value_length_in_range(&range, EndOfLinePreference::TextDefined),
            text,
            eol_count: counts.eol_count,
            first_line_length: counts.first_line_length,
            last_line_length: counts.last_line_length,
            force_move_markers,
            is_auto_whitespace_edit,
        }
    }

    /// Rewrite the line breaks of inserted text to the buffer's EOL.
    fn normalize_text(&self, text: String) -> String {
        if text.contains(['\r', '\n']) {
            replace_line_breaks(&text, self.eol().as_str())
        } else {
            text
        }
    }

    /// Text of `range` exactly as stored.
    fn raw_value_in_range(&self, range: &Range) -> String {
        self.tree.get_value_in_range(range, None)
    }

    /// One edit spanning the whole sorted batch. Untouched text between the
    /// edits is read back from the buffer.
    fn to_single_edit_operation(&self, operations: &[ValidatedEditOperation]) -> ValidatedEditOperation {
        let first_range = operations[0].range;
        let last_range = operations[operations.len() - 1].range;
        let entire_range = Range::from_positions(first_range.start(), last_range.end());

        let mut force_move_markers = false;
        let mut last_end = first_range.start();
        let mut text = String::new();
        for op in operations {
            force_move_markers |= op.force_move_markers;
            let gap = Range::from_positions(last_end, op.range.start());
            text.push_str(&self.raw_value_in_range(&gap));
            text.push_str(&op.text);
            last_end = op.range.end();
        }

        self.validated_operation(
            0,
            operations[0].identifier,
            entire_range,
            text,
            force_move_markers,
            false,
        )
    }

    /// Apply bottom-up so pending offsets stay valid.
    fn do_apply_edits(&mut self, mut operations: Vec<ValidatedEditOperation>) -> Vec<ContentChange> {
        operations.sort_by(|a, b| {
            Range::compare_using_ends(&b.range, &a.range).then(b.sort_index.cmp(&a.sort_index))
        });

        let eol = self.eol();
        let mut changes = Vec::with_capacity(operations.len());
        for op in operations {
            if op.range.is_empty() && op.text.is_empty() {
                continue;
            }

            trace!(
                offset = op.range_offset,
                length = op.range_length,
                inserted = op.text.len(),
                "applying edit"
            );
            self.tree.delete(op.range_offset, op.range_length);
            if !op.text.is_empty() {
                let eol_normalized = uses_only_eol(&op.text, eol);
                self.tree.insert(op.range_offset, &op.text, eol_normalized);
            }

            changes.push(ContentChange {
                range: op.range,
                range_offset: op.range_offset,
                range_length: op.range_length,
                text: op.text,
                force_move_markers: op.force_move_markers,
            });
        }
        changes
    }

    /// Candidate lines, descending and deduplicated, that changed and now
    /// hold only whitespace.
    fn trim_line_numbers(&self, mut candidates: Vec<TrimCandidate>) -> Vec<usize> {
        candidates.sort_by(|a, b| b.line_number.cmp(&a.line_number));

        let mut line_numbers = Vec::new();
        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 && candidates[i - 1].line_number == candidate.line_number {
                continue;
            }
            let line_content = self.get_line_content(candidate.line_number);
            if line_content.is_empty()
                || line_content == candidate.old_content
                || first_non_whitespace_index(&line_content).is_some()
            {
                continue;
            }
            line_numbers.push(candidate.line_number);
        }
        line_numbers
    }
}

/// Where each sorted operation's replacement sits once the batch is applied.
pub(crate) fn get_inverse_edit_ranges(operations: &[ValidatedEditOperation]) -> Vec<Range> {
    let mut result: Vec<Range> = Vec::with_capacity(operations.len());
    let mut prev: Option<(&ValidatedEditOperation, Range)> = None;

    for op in operations {
        let (start_line, start_column) = match prev {
            Some((prev_op, prev_range)) if prev_op.range.end_line == op.range.start_line => (
                prev_range.end_line,
                prev_range.end_column + (op.range.start_column - prev_op.range.end_column),
            ),
            Some((prev_op, prev_range)) => (
                prev_range.end_line + (op.range.start_line - prev_op.range.end_line),
                op.range.start_column,
            ),
            None => (op.range.start_line, op.range.start_column),
        };

        let range = if op.text.is_empty() {
            Range::new(start_line, start_column, start_line, start_column)
        } else if op.eol_count == 0 {
            Range::new(
                start_line,
                start_column,
                start_line,
                start_column + op.first_line_length,
            )
        } else {
            Range::new(
                start_line,
                start_column,
                start_line + op.eol_count,
                op.last_line_length + 1,
            )
        };

        prev = Some((op, range));
        result.push(range);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_tree::{EndOfLine, Position};

    fn buffer(text: &str) -> TextBuffer {
        text.parse().unwrap()
    }

    fn undo(buffer: &mut TextBuffer, result: ApplyEditsResult) {
        let reverse = result.reverse_edits.into_iter().map(Into::into).collect();
        buffer.apply_edits(reverse, false).unwrap();
    }

    #[test]
    fn out_of_order_batch_applies_and_reverses() {
        let mut buffer = buffer("line one\nline two\nline three");
        let original = buffer.get_text();

        let result = buffer
            .apply_edits(
                vec![
                    SingleEditOperation::replace(Range::new(3, 6, 3, 11), "3"),
                    SingleEditOperation::replace(Range::new(1, 1, 1, 5), "LINE\nzero"),
                ],
                false,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "LINE\nzero one\nline two\nline 3");
        assert_eq!(buffer.get_line_count(), 4);

        // reverse edits come back in submission order
        assert_eq!(result.reverse_edits[0].range, Range::new(4, 6, 4, 7));
        assert_eq!(result.reverse_edits[0].text, "three");
        assert_eq!(result.reverse_edits[1].range, Range::new(1, 1, 2, 5));
        assert_eq!(result.reverse_edits[1].text, "line");

        // applied bottom-up
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].range, Range::new(3, 6, 3, 11));
        assert_eq!(result.changes[1].range_offset, 0);

        undo(&mut buffer, result);
        assert_eq!(buffer.get_text(), original);
    }

    #[test]
    fn overlapping_ranges_reject_whole_batch() {
        let mut buffer = buffer("abcdef");
        let err = buffer
            .apply_edits(
                vec![
                    SingleEditOperation::replace(Range::new(1, 1, 1, 4), "x"),
                    SingleEditOperation::delete(Range::new(1, 3, 1, 6)),
                ],
                false,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TextBufferError::OverlappingRanges { previous, next }
                if previous == Range::new(1, 1, 1, 4) && next == Range::new(1, 3, 1, 6)
        ));
        assert_eq!(buffer.get_text(), "abcdef");
    }

    #[test]
    fn touching_ranges_keep_application_order_for_reverse() {
        let mut buffer = buffer("abcdef");
        let result = buffer
            .apply_edits(
                vec![
                    SingleEditOperation::replace(Range::new(1, 3, 1, 5), "XY"),
                    SingleEditOperation::replace(Range::new(1, 1, 1, 3), "1"),
                ],
                false,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "1XYef");
        assert_eq!(result.reverse_edits[0].sort_index, 1);
        assert_eq!(result.reverse_edits[0].range, Range::new(1, 1, 1, 2));
        assert_eq!(result.reverse_edits[1].range, Range::new(1, 2, 1, 4));

        undo(&mut buffer, result);
        assert_eq!(buffer.get_text(), "abcdef");
    }

    #[test]
    fn inserts_at_same_position_keep_submission_order() {
        let mut buffer = buffer("ab");
        let at = Position::new(1, 2);
        buffer
            .apply_edits(
                vec![
                    SingleEditOperation::insert(at, "1"),
                    SingleEditOperation::insert(at, "2"),
                ],
                false,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "a12b");
    }

    #[test]
    fn inserted_text_follows_buffer_eol() {
        let mut buffer = buffer("a\r\nb");
        assert_eq!(buffer.eol(), EndOfLine::CrLf);
        let result = buffer
            .apply_edits(
                vec![SingleEditOperation::insert(Position::new(2, 2), "\nc\rd")],
                false,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "a\r\nb\r\nc\r\nd");
        assert_eq!(result.changes[0].text, "\r\nc\r\nd");
        assert_eq!(result.reverse_edits[0].range, Range::new(2, 2, 4, 2));
        assert!(buffer.piece_tree().is_eol_normalized());

        undo(&mut buffer, result);
        assert_eq!(buffer.get_text(), "a\r\nb");
        assert!(buffer.piece_tree().is_eol_normalized());
    }

    #[test]
    fn out_of_range_positions_are_clamped() {
        let mut buffer = buffer("abc\ndef");
        buffer
            .apply_edits(
                vec![SingleEditOperation::replace(Range::new(2, 2, 9, 9), "!")],
                false,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "abc\nd!");
    }

    fn mixed_buffer(text: &str) -> TextBuffer {
        let mut builder = crate::TextBufferBuilder::new();
        builder.accept_chunk(text);
        builder.finish(false).create(EndOfLine::Lf)
    }

    #[test]
    fn undo_restores_mixed_line_endings() {
        let mut buffer = mixed_buffer("a\r\nb\nc");
        assert_eq!(buffer.eol(), EndOfLine::Lf);
        assert!(!buffer.piece_tree().is_eol_normalized());

        let result = buffer
            .apply_edits(vec![SingleEditOperation::replace(Range::new(1, 1, 3, 1), "X")], false)
            .unwrap();
        assert_eq!(buffer.get_text(), "Xc");
        assert_eq!(result.reverse_edits[0].text, "a\r\nb\n");
        assert_eq!(result.reverse_edits[0].range, Range::new(1, 1, 1, 2));

        undo(&mut buffer, result);
        assert_eq!(buffer.get_text(), "a\r\nb\nc");
        assert_eq!(buffer.get_line_count(), 3);
        assert!(!buffer.piece_tree().is_eol_normalized());
        buffer.piece_tree().check_invariants().unwrap();
    }

    #[test]
    fn undo_of_several_edits_in_mixed_buffer() {
        let original = "one\r\ntwo\nthree\r\nfour";
        let mut buffer = mixed_buffer(original);
        let result = buffer
            .apply_edits(
                vec![
                    SingleEditOperation::replace(Range::new(3, 1, 4, 1), "3\n"),
                    SingleEditOperation::replace(Range::new(1, 4, 2, 1), " "),
                ],
                false,
            )
            .unwrap();
        assert_eq!(buffer.eol(), EndOfLine::CrLf);
        assert_eq!(buffer.get_text(), "one two\n3\r\nfour");

        undo(&mut buffer, result);
        assert_eq!(buffer.get_text(), original);
    }

    #[test]
    fn preserved_text_is_inserted_verbatim() {
        let mut buffer = buffer("a\nb");
        buffer
            .apply_edits(
                vec![SingleEditOperation::insert(Position::new(1, 2), "\r\n").preserve_line_breaks()],
                false,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "a\r\n\nb");
        assert!(!buffer.piece_tree().is_eol_normalized());
    }

    #[test]
    fn empty_edits_are_skipped() {
        let mut buffer = buffer("abc");
        let result = buffer
            .apply_edits(
                vec![SingleEditOperation::delete(Range::new(1, 2, 1, 2))],
                false,
            )
            .unwrap();
        assert!(result.changes.is_empty());
        assert_eq!(result.reverse_edits.len(), 1);
        assert_eq!(buffer.get_text(), "abc");
    }

    #[test]
    fn content_hints_only_grow() {
        let mut buffer = buffer("plain");
        buffer
            .apply_edits(
                vec![SingleEditOperation::insert(Position::new(1, 1), "\u{5e9}")],
                false,
            )
            .unwrap();
        assert!(buffer.might_contain_rtl());
        assert!(buffer.might_contain_non_basic_ascii());

        buffer
            .apply_edits(
                vec![SingleEditOperation::delete(Range::new(1, 1, 1, 3))],
                false,
            )
            .unwrap();
        assert!(buffer.might_contain_rtl());
    }

    #[test]
    fn large_batches_are_collapsed() {
        let text: String = (0..1200).map(|i| format!("{i}\n")).collect();
        let mut buffer = buffer(&text);
        let operations = (1..=1200)
            .map(|line| SingleEditOperation::insert(Position::new(line, 1), "#"))
            .collect();

        let result = buffer.apply_edits(operations, false).unwrap();
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.reverse_edits.len(), 1);
        let expected: String = (0..1200).map(|i| format!("#{i}\n")).collect();
        assert_eq!(buffer.get_text(), expected);

        undo(&mut buffer, result);
        assert_eq!(buffer.get_text(), text);
    }

    #[test]
    fn tracked_batches_are_not_collapsed() {
        let text: String = (0..1001).map(|i| format!("{i}\n")).collect();
        let mut buffer = buffer(&text);
        let operations = (1..=1001)
            .map(|line| SingleEditOperation::insert(Position::new(line, 1), "#").tracked())
            .collect();

        let result = buffer.apply_edits(operations, false).unwrap();
        assert_eq!(result.changes.len(), 1001);
    }

    #[test]
    fn auto_whitespace_lines_are_reported() {
        let mut buffer = buffer("abc\n\nxyz");
        let result = buffer
            .apply_edits(
                vec![
                    SingleEditOperation::insert(Position::new(2, 1), "    ").auto_whitespace(),
                    SingleEditOperation::insert(Position::new(1, 4), "\n  ").auto_whitespace(),
                ],
                true,
            )
            .unwrap();
        assert_eq!(buffer.get_text(), "abc\n  \n    \nxyz");
        assert_eq!(result.trim_auto_whitespace_line_numbers, Some(vec![3, 2]));

        let result = buffer
            .apply_edits(
                vec![SingleEditOperation::insert(Position::new(4, 1), "  ")],
                true,
            )
            .unwrap();
        assert_eq!(result.trim_auto_whitespace_line_numbers, None);
    }

    #[test]
    fn inverse_ranges_shift_by_earlier_edits() {
        let buffer = buffer("aaaa\nbbbb\ncccc");
        let ops = vec![
            buffer.validated_operation(0, None, Range::new(1, 2, 1, 3), "xyz".into(), false, false),
            buffer.validated_operation(1, None, Range::new(1, 4, 2, 2), "\n\n".into(), false, false),
            buffer.validated_operation(2, None, Range::new(3, 1, 3, 5), String::new(), false, false),
        ];
        let ranges = get_inverse_edit_ranges(&ops);
        assert_eq!(ranges[0], Range::new(1, 2, 1, 5));
        assert_eq!(ranges[1], Range::new(1, 6, 3, 1));
        assert_eq!(ranges[2], Range::new(4, 1, 4, 1));
    }
}
