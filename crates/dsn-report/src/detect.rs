//! A cheap, header-only check for whether a message is a delivery
//! status notification
use crate::lines::{starts_with_ignore_case, LineReader};

const NULL_RETURN_PATH: &str = "Return-path: <>";

/// The outcome of a successful detection: a reader positioned just
/// after the top level `Content-Type` header, and the MIME boundary
/// that delimits the parts of the report
#[derive(Debug, Clone)]
pub(crate) struct Detection<'a> {
    pub reader: LineReader<'a>,
    pub boundary: String,
}

fn is_delivery_status_report(lower: &str) -> bool {
    lower.contains("report-type=delivery-status")
        || lower.contains("report-type=\"delivery-status\"")
}

/// Extract the value of the `boundary=` parameter from a content type
fn extract_boundary(content_type: &str) -> Option<String> {
    // ASCII lowercasing preserves offsets
    let idx = content_type.to_ascii_lowercase().find("boundary=")?;
    let value = content_type[idx + "boundary=".len()..]
        .trim_start_matches(|c: char| c == '"' || c.is_ascii_whitespace());
    let end = value
        .find(|c: char| c == '"' || c == ';' || c.is_ascii_whitespace())
        .unwrap_or(value.len());
    let boundary = &value[..end];
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

pub(crate) fn detect(text: &str) -> Option<Detection<'_>> {
    // Bounces are sent with a null reverse path. Checking this first
    // lets us reject most messages without looking any further.
    if !starts_with_ignore_case(text, NULL_RETURN_PATH) {
        return None;
    }

    let mut reader = LineReader::new(text);
    while let Some(line) = reader.next_logical_line() {
        if line.is_blank() {
            // End of the top level headers
            break;
        }
        if !starts_with_ignore_case(line.text(), "Content-Type:") {
            continue;
        }
        if !is_delivery_status_report(&line.text().to_ascii_lowercase()) {
            tracing::trace!("not a delivery-status report: {}", line.text());
            return None;
        }
        let Some(boundary) = extract_boundary(line.text()) else {
            tracing::debug!("delivery-status report without a boundary: {}", line.text());
            return None;
        };
        return Some(Detection { reader, boundary });
    }

    None
}

/// Returns true if `header_text` looks like the headers of a delivery
/// status notification. Only the headers are required, so this can be
/// used to decide whether it is worth fetching the rest of a message.
pub fn is_dsn(header_text: &str) -> bool {
    detect(header_text).is_some()
}

#[cfg(test)]
mod test {
    use super::*;

    const HEADERS: &str = "Return-path: <>\r\n\
        Date: Thu, 7 Jul 1994 17:16:05 -0400\r\n\
        Content-Type: multipart/report; report-type=delivery-status;\r\n\
        \tboundary=\"RAA14128.773615765/CS.UTK.EDU\"\r\n\
        \r\n";

    #[test]
    fn folded_boundary() {
        let detection = detect(HEADERS).unwrap();
        k9::assert_equal!(detection.boundary, "RAA14128.773615765/CS.UTK.EDU");
        // Positioned after the content type
        let mut reader = detection.reader;
        k9::assert_equal!(reader.next_logical_line().unwrap().text(), "");
    }

    #[test]
    fn requires_null_return_path() {
        let headers = HEADERS.replace("Return-path: <>", "Return-path: <someone@example.com>");
        assert!(!is_dsn(&headers));
        let headers = format!("X-First: yes\r\n{HEADERS}");
        assert!(!is_dsn(&headers));
    }

    #[test]
    fn return_path_case_insensitive() {
        let headers = HEADERS.replace("Return-path: <>", "RETURN-PATH: <>");
        assert!(is_dsn(&headers));
    }

    #[test]
    fn quoted_report_type_and_unquoted_boundary() {
        let headers = "Return-Path: <>\n\
            content-type: multipart/report; report-type=\"delivery-status\"; boundary=abc123\n\
            \n";
        let detection = detect(headers).unwrap();
        k9::assert_equal!(detection.boundary, "abc123");
    }

    #[test]
    fn other_report_types() {
        let headers = "Return-path: <>\n\
            Content-Type: multipart/report; report-type=feedback-report; boundary=x\n\n";
        assert!(!is_dsn(headers));
        let headers = "Return-path: <>\nContent-Type: text/plain\n\n";
        assert!(!is_dsn(headers));
    }

    #[test]
    fn missing_boundary() {
        let headers = "Return-path: <>\n\
            Content-Type: multipart/report; report-type=delivery-status\n\n";
        assert!(!is_dsn(headers));
    }

    #[test]
    fn content_type_in_body_is_not_considered() {
        let message = "Return-path: <>\n\
            Subject: hello\n\
            \n\
            Content-Type: multipart/report; report-type=delivery-status; boundary=x\n";
        assert!(!is_dsn(message));
    }
}
