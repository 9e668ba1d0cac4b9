use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use piece_tree::EndOfLine;
use tracing::debug;

use crate::TextBufferBuilder;
use crate::buffer::TextBuffer;
use crate::error::Result;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Stream a UTF-8 file into a [`TextBuffer`], normalizing line endings to
/// the majority. Invalid sequences become U+FFFD.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<TextBuffer> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut builder = TextBufferBuilder::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut carry: Vec<u8> = Vec::new();
    let mut total = 0;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        total += n;

        // bytes left from the previous read come first
        carry.extend_from_slice(&buf[..n]);
        let consumed = decode_into(&carry, &mut builder);

        carry.drain(..consumed);
    }

    // a truncated sequence at end of file
    if !carry.is_empty() {
        builder.accept_chunk(&String::from_utf8_lossy(&carry));
    }

    let buffer = builder.finish(true).create(EndOfLine::Lf);
    debug!(
        path = %path.display(),
        bytes = total,
        lines = buffer.get_line_count(),
        eol = %buffer.eol(),
        "loaded text buffer"
    );
    Ok(buffer)
}

/// Feed the decodable prefix of `bytes` to `builder` and return how many
/// bytes were used. An incomplete sequence at the end is left over.
fn decode_into(bytes: &[u8], builder: &mut TextBufferBuilder) -> usize {
    let mut consumed = 0;
    while consumed < bytes.len() {
        match std::str::from_utf8(&bytes[consumed..]) {
            Ok(text) => {
                builder.accept_chunk(text);
                return bytes.len();
            }
            Err(e) => {
                let valid = &bytes[consumed..consumed + e.valid_up_to()];
                builder.accept_chunk(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        builder.accept_chunk("\u{fffd}");
                        consumed += e.valid_up_to() + len;
                    }
                    None => return consumed + e.valid_up_to(),
                }
            }
        }
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn load_small_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "\u{feff}first\r\nsecond\r\nthird").unwrap();

        let buffer = load_from_path(file.path()).unwrap();
        assert_eq!(buffer.bom(), "\u{feff}");
        assert_eq!(buffer.eol(), EndOfLine::CrLf);
        assert_eq!(buffer.get_line_count(), 3);
        assert_eq!(buffer.get_line_content(2), "second");
    }

    #[test]
    fn multibyte_chars_across_read_boundaries() {
        let line = "\u{e9}\u{4e2d}\u{1f600}\r\n";
        let text = line.repeat(READ_CHUNK_SIZE / line.len() * 3 + 7);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let buffer = load_from_path(file.path()).unwrap();
        assert_eq!(buffer.get_text(), text);
        assert_eq!(buffer.get_line_count(), text.matches("\r\n").count() + 1);
        buffer.piece_tree().check_invariants().unwrap();
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ab\xffcd\xe4").unwrap();

        let buffer = load_from_path(file.path()).unwrap();
        assert_eq!(buffer.get_text(), "ab\u{fffd}cd\u{fffd}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, crate::TextBufferError::Io(_)));
    }
}
