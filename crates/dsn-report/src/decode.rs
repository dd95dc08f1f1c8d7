//! Decoding of RFC 2047 encoded-words in header values.
//!
//! Only the `=?utf-8?B?...?=` form is understood. Anything else that
//! looks like an encoded-word, including the quoted-printable
//! `=?utf-8?Q?...?=` form, is reported as unsupported so that the
//! caller can fall back to the raw value.
use crate::HeaderDecodeError;
use std::borrow::Cow;

const PREFIX: &str = "=?utf-8?b?";

fn decode_base64(encoded: &str) -> Result<String, HeaderDecodeError> {
    let bytes = match data_encoding::BASE64.decode(encoded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => data_encoding::BASE64_NOPAD.decode(encoded.as_bytes())?,
    };
    Ok(String::from_utf8(bytes)?)
}

/// Decode `value`, which may consist of several concatenated
/// encoded-words. Values that contain no encoded-word are returned
/// unchanged.
pub fn decode_header_value(value: &str) -> Result<Cow<'_, str>, HeaderDecodeError> {
    if !value.contains("=?") {
        return Ok(Cow::Borrowed(value));
    }

    // ASCII lowercasing preserves byte offsets, so indices found in
    // `lower` are valid in `value`
    let lower = value.to_ascii_lowercase();
    let starts: Vec<usize> = lower.match_indices(PREFIX).map(|(idx, _)| idx).collect();

    let leading = &value[..starts.first().copied().unwrap_or(value.len())];
    if starts.is_empty() || leading.contains("=?") {
        return Err(HeaderDecodeError::UnsupportedEncoding(value.to_string()));
    }

    let mut decoded = leading.to_string();

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(value.len());
        let segment = &value[start + PREFIX.len()..end];

        let (encoded, trailing) = segment
            .split_once("?=")
            .ok_or_else(|| HeaderDecodeError::Unterminated(value.to_string()))?;

        if trailing.contains("=?") {
            return Err(HeaderDecodeError::UnsupportedEncoding(value.to_string()));
        }

        decoded.push_str(&decode_base64(encoded)?);

        // Whitespace between adjacent encoded-words is not part of the value
        if starts.get(i + 1).is_none() || !trailing.trim().is_empty() {
            decoded.push_str(trailing);
        }
    }

    Ok(Cow::Owned(decoded))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn passthrough() {
        k9::assert_equal!(
            decode_header_value("plain old subject").unwrap(),
            "plain old subject"
        );
    }

    #[test]
    fn single_word() {
        k9::assert_equal!(
            decode_header_value("=?utf-8?B?SMOpbGxv?=").unwrap(),
            "Héllo"
        );
        k9::assert_equal!(
            decode_header_value("=?UTF-8?b?SMOpbGxv?=").unwrap(),
            "Héllo"
        );
    }

    #[test]
    fn concatenated_words() {
        k9::assert_equal!(
            decode_header_value("=?utf-8?B?SGVsbG8s?==?utf-8?B?IHdvcmxk?=").unwrap(),
            "Hello, world"
        );
        k9::assert_equal!(
            decode_header_value("Re: =?utf-8?B?SGVsbG8s?=\r\n =?utf-8?B?IHdvcmxk?=").unwrap(),
            "Re: Hello, world"
        );
    }

    #[test]
    fn quoted_printable_is_unsupported() {
        assert!(matches!(
            decode_header_value("=?utf-8?Q?H=C3=A9llo?="),
            Err(HeaderDecodeError::UnsupportedEncoding(_))
        ));
        assert!(matches!(
            decode_header_value("=?iso-8859-1?B?SGVsbG8=?="),
            Err(HeaderDecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn bad_base64() {
        assert!(matches!(
            decode_header_value("=?utf-8?B?!!!!?="),
            Err(HeaderDecodeError::Base64(_))
        ));
        assert!(matches!(
            decode_header_value("=?utf-8?B?SGVsbG8"),
            Err(HeaderDecodeError::Unterminated(_))
        ));
    }
}
