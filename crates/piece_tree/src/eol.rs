use std::fmt;

/// Line terminator a document is written with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EndOfLine {
    #[default]
    Lf,
    CrLf,
}

impl EndOfLine {
    pub fn as_str(self) -> &'static str {
        match self {
            EndOfLine::Lf => "\n",
            EndOfLine::CrLf => "\r\n",
        }
    }

    pub fn len(self) -> usize {
        self.as_str().len()
    }
}

impl fmt::Display for EndOfLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndOfLine::Lf => write!(f, "LF"),
            EndOfLine::CrLf => write!(f, "CRLF"),
        }
    }
}

/// Replace every `\r\n`, `\r` and `\n` in `text` with `eol`.
pub fn replace_line_breaks(text: &str, eol: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut seg_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                out.push_str(&text[seg_start..i]);
                out.push_str(eol);
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    i += 1;
                }
                seg_start = i + 1;
            }
            b'\n' => {
                out.push_str(&text[seg_start..i]);
                out.push_str(eol);
                seg_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&text[seg_start..]);
    out
}
