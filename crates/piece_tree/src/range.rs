use std::cmp::Ordering;
use std::fmt;

/// A 1-based `(line, column)` position in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self < other
    }

    pub fn is_before_or_equal(&self, other: &Position) -> bool {
        self <= other
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.column)
    }
}

/// A span between two 1-based positions. The end is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Range {
    /// Builds a range, swapping the endpoints if they are given in reverse.
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        if (start_line, start_column) > (end_line, end_column) {
            return Self {
                start_line: end_line,
                start_column: end_column,
                end_line: start_line,
                end_column: start_column,
            };
        }
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn from_positions(start: Position, end: Position) -> Self {
        Self::new(start.line, start.column, end.line, end.column)
    }

    /// An empty range at `position`.
    pub fn collapsed(position: Position) -> Self {
        Self::from_positions(position, position)
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_column)
    }

    pub fn is_empty(&self) -> bool {
        self.start_line == self.end_line && self.start_column == self.end_column
    }

    /// Orders by end position first, then by start position.
    pub fn compare_using_ends(a: &Range, b: &Range) -> Ordering {
        a.end().cmp(&b.end()).then_with(|| a.start().cmp(&b.start()))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} -> {}]", self.start(), self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_reversed_endpoints() {
        let range = Range::new(3, 4, 1, 2);
        assert_eq!(range.start(), Position::new(1, 2));
        assert_eq!(range.end(), Position::new(3, 4));
    }

    #[test]
    fn compare_using_ends_breaks_ties_on_start() {
        let a = Range::new(1, 1, 2, 5);
        let b = Range::new(1, 3, 2, 5);
        let c = Range::new(1, 1, 2, 6);
        assert_eq!(Range::compare_using_ends(&a, &b), Ordering::Less);
        assert_eq!(Range::compare_using_ends(&b, &c), Ordering::Less);
        assert_eq!(Range::compare_using_ends(&a, &a), Ordering::Equal);
    }

    #[test]
    fn position_ordering() {
        let p = Position::new(2, 3);
        assert!(p.is_before(&Position::new(2, 4)));
        assert!(p.is_before(&Position::new(3, 1)));
        assert!(p.is_before_or_equal(&p));
        assert!(!p.is_before(&p));
    }
}
