use piece_tree::EndOfLine;

/// Whether `text` contains a character from a right-to-left script.
pub fn contains_rtl(text: &str) -> bool {
    text.chars().any(|ch| {
        matches!(ch as u32,
            0x0590..=0x08FF // Hebrew, Arabic, Syriac, Thaana, NKo, Samaritan, Mandaic
            | 0xFB1D..=0xFDFF // Hebrew and Arabic presentation forms A
            | 0xFE70..=0xFEFC // Arabic presentation forms B
            | 0x10800..=0x10FFF // Cypriot through Old Hungarian
            | 0x1E800..=0x1EFFF // Mende Kikakui through Arabic mathematical symbols
        )
    })
}

/// Tab, line breaks and printable ASCII only.
pub fn is_basic_ascii(text: &str) -> bool {
    text.bytes()
        .all(|b| b == b'\t' || b == b'\n' || b == b'\r' || (0x20..=0x7e).contains(&b))
}

/// Byte index of the first char that is not a space or tab.
pub fn first_non_whitespace_index(text: &str) -> Option<usize> {
    text.bytes().position(|b| b != b' ' && b != b'\t')
}

/// Byte index of the last char that is not a space or tab.
pub fn last_non_whitespace_index(text: &str) -> Option<usize> {
    text.bytes().rposition(|b| b != b' ' && b != b'\t')
}

/// Whether every line break in `text` is `eol`.
pub(crate) fn uses_only_eol(text: &str, eol: EndOfLine) -> bool {
    let bytes = text.as_bytes();
    match eol {
        EndOfLine::Lf => !bytes.contains(&b'\r'),
        EndOfLine::CrLf => bytes.iter().enumerate().all(|(i, &b)| match b {
            b'\r' => bytes.get(i + 1) == Some(&b'\n'),
            b'\n' => i > 0 && bytes[i - 1] == b'\r',
            _ => true,
        }),
    }
}

/// Line break statistics of an inserted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct EolCount {
    pub(crate) eol_count: usize,
    pub(crate) first_line_length: usize,
    pub(crate) last_line_length: usize,
}

/// Count `\r\n`, `\r` and `\n` breaks and measure the first and last line.
pub(crate) fn count_eol(text: &str) -> EolCount {
    let bytes = text.as_bytes();
    let mut eol_count = 0;
    let mut first_line_length = text.len();
    let mut last_line_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let break_len = match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' | b'\n' => 1,
            _ => 0,
        };
        if break_len == 0 {
            i += 1;
            continue;
        }
        if eol_count == 0 {
            first_line_length = i;
        }
        eol_count += 1;
        i += break_len;
        last_line_start = i;
    }

    EolCount {
        eol_count,
        first_line_length,
        last_line_length: text.len() - last_line_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_ascii_rejects_only_non_basic_chars() {
        assert!(is_basic_ascii(""));
        assert!(is_basic_ascii("hello world\r\n\tok"));
        assert!(!is_basic_ascii("caf\u{e9}"));
        assert!(!is_basic_ascii("bell\u{7}"));
    }

    #[test]
    fn rtl_detection() {
        assert!(!contains_rtl("plain text"));
        assert!(contains_rtl("shalom \u{5e9}\u{5dc}\u{5d5}\u{5dd}"));
        assert!(contains_rtl("\u{627}\u{644}\u{639}\u{631}\u{628}\u{64a}\u{629}"));
        assert!(!contains_rtl("\u{4e2d}\u{6587}"));
    }

    #[test]
    fn whitespace_indexes() {
        assert_eq!(first_non_whitespace_index("  \tab "), Some(3));
        assert_eq!(last_non_whitespace_index("  \tab "), Some(4));
        assert_eq!(first_non_whitespace_index(" \t "), None);
        assert_eq!(last_non_whitespace_index(""), None);
    }

    #[test]
    fn uses_only_eol_checks_every_break() {
        assert!(uses_only_eol("", EndOfLine::CrLf));
        assert!(uses_only_eol("a\nb", EndOfLine::Lf));
        assert!(!uses_only_eol("a\r\nb", EndOfLine::Lf));
        assert!(uses_only_eol("a\r\nb\r\n", EndOfLine::CrLf));
        assert!(!uses_only_eol("a\r\nb\n", EndOfLine::CrLf));
        assert!(!uses_only_eol("\n", EndOfLine::CrLf));
        assert!(!uses_only_eol("a\r", EndOfLine::CrLf));
    }

    #[test]
    fn count_eol_measures_first_and_last_line() {
        assert_eq!(
            count_eol("abc"),
            EolCount {
                eol_count: 0,
                first_line_length: 3,
                last_line_length: 3
            }
        );
        assert_eq!(
            count_eol("ab\r\ncde\rf\ngh"),
            EolCount {
                eol_count: 3,
                first_line_length: 2,
                last_line_length: 2
            }
        );
        assert_eq!(
            count_eol("\n"),
            EolCount {
                eol_count: 1,
                first_line_length: 0,
                last_line_length: 0
            }
        );
    }
}
