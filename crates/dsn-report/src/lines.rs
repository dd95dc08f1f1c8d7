//! A cursor over an in-memory message that yields logical lines,
//! with RFC 5322 folded continuation lines merged into the line
//! that they continue.
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine<'a> {
    /// The verbatim text, including the line terminators of each
    /// physical line that makes up this logical line
    raw: &'a str,
    /// The unfolded text, without any line terminator
    text: Cow<'a, str>,
}

impl<'a> LogicalLine<'a> {
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LineReader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Consume one physical line, returning (content, content+terminator)
    fn physical_line(&mut self) -> Option<(&'a str, &'a str)> {
        if self.is_eof() {
            return None;
        }
        let remaining = &self.input[self.pos..];
        let (with_eol, content) = match remaining.find('\n') {
            Some(idx) => {
                let with_eol = &remaining[..=idx];
                let content = &remaining[..idx];
                (with_eol, content.strip_suffix('\r').unwrap_or(content))
            }
            None => (remaining, remaining),
        };
        self.pos += with_eol.len();
        Some((content, with_eol))
    }

    fn next_is_continuation(&self) -> bool {
        matches!(self.input.as_bytes().get(self.pos), Some(b' ' | b'\t'))
    }

    /// Read the next line, folding in any immediately following lines
    /// that begin with a space or tab. Blank lines and MIME delimiter
    /// lines never absorb continuations.
    pub fn next_logical_line(&mut self) -> Option<LogicalLine<'a>> {
        let start = self.pos;
        let (first, _) = self.physical_line()?;
        let mut text = Cow::Borrowed(first);

        if !first.trim().is_empty() && !first.starts_with("--") {
            while self.next_is_continuation() {
                match self.physical_line() {
                    Some((continuation, _)) => text.to_mut().push_str(continuation),
                    None => break,
                }
            }
        }

        Some(LogicalLine {
            raw: &self.input[start..self.pos],
            text,
        })
    }
}

/// Split a `name: value` line. The value is trimmed.
/// Returns None for lines that do not look like a header field.
pub fn split_field(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    if name.is_empty() || name.contains(|c: char| c.is_ascii_whitespace()) {
        return None;
    }
    Some((name, value.trim()))
}

/// Returns true if `line` starts with `prefix`, ignoring ASCII case
pub fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.len() >= prefix.len()
        && line.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Returns true for the MIME delimiter line `--{boundary}`, including
/// the closing `--{boundary}--` form
pub fn is_boundary(line: &str, boundary: &str) -> bool {
    line.strip_prefix("--")
        .and_then(|rest| rest.strip_prefix(boundary))
        .map(|rest| {
            let rest = rest.trim_end();
            rest.is_empty() || rest == "--"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    fn collect(input: &str) -> Vec<(String, String)> {
        let mut reader = LineReader::new(input);
        let mut lines = vec![];
        while let Some(line) = reader.next_logical_line() {
            lines.push((line.raw().to_string(), line.text().to_string()));
        }
        lines
    }

    #[test]
    fn folding() {
        k9::assert_equal!(
            collect("Subject: hello\r\n there\r\n\tfriend\r\nTo: me\r\n\r\n body\r\n"),
            vec![
                (
                    "Subject: hello\r\n there\r\n\tfriend\r\n".to_string(),
                    "Subject: hello there\tfriend".to_string()
                ),
                ("To: me\r\n".to_string(), "To: me".to_string()),
                ("\r\n".to_string(), "".to_string()),
                (" body\r\n".to_string(), " body".to_string()),
            ]
        );
    }

    #[test]
    fn bare_newlines_and_no_trailing_newline() {
        k9::assert_equal!(
            collect("a: 1\n b\nc: 2"),
            vec![
                ("a: 1\n b\n".to_string(), "a: 1 b".to_string()),
                ("c: 2".to_string(), "c: 2".to_string()),
            ]
        );
    }

    #[test]
    fn delimiters_do_not_fold() {
        k9::assert_equal!(
            collect("--abc\n   text\n"),
            vec![
                ("--abc\n".to_string(), "--abc".to_string()),
                ("   text\n".to_string(), "   text".to_string()),
            ]
        );
    }

    #[test]
    fn eof() {
        let mut reader = LineReader::new("");
        assert!(reader.is_eof());
        k9::assert_equal!(reader.next_logical_line(), None);
    }

    #[test]
    fn fields() {
        k9::assert_equal!(
            split_field("Status: 5.1.1 "),
            Some(("Status", "5.1.1"))
        );
        k9::assert_equal!(
            split_field("Final-Recipient: rfc822; a@example.com"),
            Some(("Final-Recipient", "rfc822; a@example.com"))
        );
        k9::assert_equal!(split_field("not a field"), None);
        k9::assert_equal!(split_field("has space: no"), None);
        k9::assert_equal!(split_field(": empty"), None);
    }

    #[test]
    fn boundaries() {
        assert!(is_boundary("--abc", "abc"));
        assert!(is_boundary("--abc--", "abc"));
        assert!(is_boundary("--abc  ", "abc"));
        assert!(!is_boundary("--abcd", "abc"));
        assert!(!is_boundary("abc", "abc"));
        assert!(starts_with_ignore_case("content-TYPE: x", "Content-Type:"));
        assert!(!starts_with_ignore_case("Content", "Content-Type:"));
    }
}
