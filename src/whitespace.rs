// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Trailing whitespace removal.
//!
//! Works line by line over raw bytes, so files in any encoding survive
//! untouched apart from their line ends. Every line is written back with
//! exactly one `\n`, which also turns CRLF into LF and adds a final newline
//! to files missing one.

use crate::filter::{FailurePolicy, Filter, Result, Transform};

use std::io::{BufRead, Write};

/// Bytes considered trailing whitespace.
const TRAILING: &[u8] = b" \t\n\x0b\x0c\r\0";

/// Slice of line without its trailing whitespace.
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|byte| !TRAILING.contains(byte))
        .map_or(0, |index| index + 1);

    &line[..end]
}

/// Stream lines from reader to writer without trailing whitespace.
///
/// Lines are pulled one at a time, so input size is not bounded by memory.
///
/// # Errors
///
/// - Return [`std::io::Error`] if reading or writing fails.
pub fn strip_lines(mut reader: impl BufRead, mut writer: impl Write) -> std::io::Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        writer.write_all(trim_line_end(&line))?;
        writer.write_all(b"\n")?;
    }

    writer.flush()
}

/// Strip trailing whitespace from every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripWhitespace;

impl Transform for StripWhitespace {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() + 1);
        strip_lines(input, &mut output)?;

        Ok(output)
    }
}

impl Filter for StripWhitespace {
    fn policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn strip(input: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        strip_lines(input, &mut output).unwrap();
        output
    }

    #[test_case(b"a \nb\t\n", b"a\nb\n"; "spaces and tabs")]
    #[test_case(b"a\r\nb\r\n", b"a\nb\n"; "crlf")]
    #[test_case(b"no newline  ", b"no newline\n"; "missing final newline")]
    #[test_case(b"", b""; "empty input")]
    #[test_case(b"\n  \n\t\n", b"\n\n\n"; "blank lines are kept")]
    #[test_case(b"  lead\x0b\x0c\0\n", b"  lead\n"; "leading kept, odd trailing removed")]
    #[test_case(b"caf\xc3\xa9 \n\xff\xfe \n", b"caf\xc3\xa9\n\xff\xfe\n"; "non utf8")]
    #[test]
    fn strip_lines_removes_trailing_whitespace(input: &[u8], expect: &[u8]) {
        pretty_assertions::assert_eq!(strip(input), expect.to_vec());
    }

    #[test]
    fn strip_lines_is_idempotent() {
        let input = indoc! {"
            fn main() {
                println!(\"hello\");\t
            }
        "};
        let once = strip(input.as_bytes());
        let twice = strip(&once);

        assert_eq!(once, twice);
        assert_eq!(
            String::from_utf8_lossy(&once),
            "fn main() {\n    println!(\"hello\");\n}\n"
        );
    }

    #[test]
    fn strip_whitespace_leaves_conforming_file_unchanged() -> anyhow::Result<()> {
        let input = b"already\nclean\n".to_vec();
        let outcome = StripWhitespace.filter(input.clone())?;

        assert_eq!(outcome.into_bytes(), input);
        Ok(())
    }
}
