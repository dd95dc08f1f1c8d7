//! Line oriented parsing of RFC 3464 delivery status notifications.
//!
//! Rather than building a full MIME tree, the parser walks the message
//! once: it locates the delivery-status part using the boundary found
//! by detection, collects the per-message and per-recipient fields,
//! then looks for the returned headers of the original message.
use crate::date::parse_date;
use crate::detect::{detect, Detection};
use crate::lines::{is_boundary, split_field, starts_with_ignore_case, LineReader, LogicalLine};
use crate::{
    DeliveryReport, DiagnosticPatterns, DsnError, DsnParserConfig, Status, StatusBuilder,
    StatusError,
};
use anyhow::anyhow;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

const DELIVERY_STATUS_TYPES: &[&str] = &[
    "message/delivery-status",
    "message/global-delivery-status",
];

const ORIGINAL_MESSAGE_TYPES: &[&str] = &[
    "text/rfc822-headers",
    "message/rfc822",
    "message/global-headers",
    "message/global",
];

/// Returns true if `line` is a `Content-Type` header naming one of `types`
fn announces(line: &str, types: &[&str]) -> bool {
    let Some(value) = line
        .get(.."Content-Type:".len())
        .filter(|prefix| prefix.eq_ignore_ascii_case("Content-Type:"))
        .map(|_| line["Content-Type:".len()..].trim_start())
    else {
        return false;
    };
    types.iter().any(|t| {
        starts_with_ignore_case(value, t)
            && value[t.len()..]
                .chars()
                .next()
                .map_or(true, |c| c == ';' || c.is_ascii_whitespace())
    })
}

/// Strip the address type from a recipient field: `rfc822; a@example.com`
fn recipient_address(value: &str) -> String {
    let value = value.trim();
    match value.split_once(';') {
        Some((kind, address)) if kind.trim().eq_ignore_ascii_case("rfc822") => {
            address.trim().to_string()
        }
        _ => value.to_string(),
    }
}

#[derive(Default, Debug)]
struct PerMessageFields {
    reporting_agent: Option<String>,
    received_from_agent: Option<String>,
    arrival_date: Option<chrono::DateTime<chrono::Utc>>,
    original_envelope_id: Option<String>,
    dsn_gateway: Option<String>,
}

/// The section of the report that describes a single recipient
#[derive(Debug)]
struct RecipientBlock {
    recipient: String,
    fields: StatusBuilder,
    /// Set once a blank line has been seen inside this block; after
    /// that, `Original-Recipient` introduces the next block
    seen_blank: bool,
    next_original_recipient: Option<String>,
}

impl RecipientBlock {
    fn new(final_recipient: &str, original_recipient: Option<String>) -> Self {
        Self {
            recipient: recipient_address(final_recipient),
            fields: StatusBuilder {
                original_recipient,
                ..Default::default()
            },
            seen_blank: false,
            next_original_recipient: None,
        }
    }

    fn apply(&mut self, name: &str, value: &str) {
        match name.to_ascii_lowercase().as_str() {
            "action" => self.fields.action = Some(value.to_string()),
            "status" => self.fields.status = Some(value.to_string()),
            "diagnostic-code" => self.fields.diagnostic = Some(value.to_string()),
            "will-retry-until" => self.fields.will_retry_until = parse_date(value),
            "remote-mta" => self.fields.remote_mta = Some(value.to_string()),
            "last-attempt-date" => self.fields.last_attempt_date = parse_date(value),
            "final-log-id" => self.fields.final_log_id = Some(value.to_string()),
            "original-recipient" => {
                let address = recipient_address(value);
                if self.seen_blank {
                    self.next_original_recipient = Some(address);
                } else {
                    self.fields.original_recipient = Some(address);
                }
            }
            _ => tracing::trace!("ignoring per-recipient field {name}: {value}"),
        }
    }
}

/// Everything gathered from the delivery-status part
struct ReportSection<'a> {
    fields: PerMessageFields,
    status_by_recipient: BTreeMap<String, Status>,
    raw_report_block: String,
    /// The boundary line that ended the section, or None at end of input
    terminator: Option<LogicalLine<'a>>,
}

/// Parses delivery status notifications.
///
/// A parser holds no per-message state, so one instance can be
/// shared and used for any number of messages.
#[derive(Debug, Clone)]
pub struct DsnParser {
    patterns: DiagnosticPatterns,
    original_message_part_limit: usize,
}

impl Default for DsnParser {
    fn default() -> Self {
        Self::with_patterns(
            DiagnosticPatterns::builtin().clone(),
            DsnParserConfig::default().original_message_part_limit,
        )
    }
}

impl DsnParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_patterns(
        patterns: DiagnosticPatterns,
        original_message_part_limit: usize,
    ) -> Self {
        Self {
            patterns,
            original_message_part_limit,
        }
    }

    /// Parse `message` as a delivery status notification.
    ///
    /// Returns `Ok(None)` if the message is not a report, or if it is
    /// too malformed to make sense of. An error is returned only if
    /// parsing failed in some unexpected way.
    pub fn try_create(&self, message: &str) -> Result<Option<DeliveryReport>, DsnError> {
        catch_unwind(AssertUnwindSafe(|| self.parse(message))).map_err(|panic| {
            let cause = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            DsnError::Internal {
                source: anyhow!("panicked: {cause}"),
                raw_message: message.to_string(),
            }
        })
    }

    fn parse(&self, message: &str) -> Option<DeliveryReport> {
        let Some(Detection {
            mut reader,
            boundary,
        }) = detect(message)
        else {
            tracing::trace!("not a delivery status notification");
            return None;
        };

        if !seek_delivery_status(&mut reader, &boundary) {
            tracing::debug!("delivery-status part not found before end of input");
            return None;
        }

        let date = report_date(message);

        let section = match self.parse_report_section(&mut reader, &boundary) {
            Ok(section) => section,
            Err(err) => {
                tracing::debug!("abandoning report: {err:#}");
                return None;
            }
        };

        let Some(reporting_agent) = section.fields.reporting_agent else {
            tracing::debug!("abandoning report: Reporting-MTA is missing");
            return None;
        };

        let original_message_headers =
            self.original_message_headers(&mut reader, &boundary, section.terminator);

        Some(DeliveryReport {
            id: None,
            date,
            reporting_agent,
            received_from_agent: section.fields.received_from_agent,
            arrival_date: section.fields.arrival_date,
            original_envelope_id: section.fields.original_envelope_id,
            dsn_gateway: section.fields.dsn_gateway,
            status_by_recipient: section.status_by_recipient,
            raw_report_block: section.raw_report_block,
            original_message_headers,
        })
    }

    fn parse_report_section<'a>(
        &self,
        reader: &mut LineReader<'a>,
        boundary: &str,
    ) -> Result<ReportSection<'a>, StatusError> {
        let mut fields = PerMessageFields::default();
        let mut raw_report_block = String::new();
        let mut status_by_recipient = BTreeMap::new();
        let mut pending_original_recipient = None;

        while let Some(line) = reader.next_logical_line() {
            if is_boundary(line.text(), boundary) {
                return Ok(ReportSection {
                    fields,
                    status_by_recipient,
                    raw_report_block,
                    terminator: Some(line),
                });
            }
            raw_report_block.push_str(line.raw());

            let Some((name, value)) = split_field(line.text()) else {
                continue;
            };

            match name.to_ascii_lowercase().as_str() {
                "reporting-mta" => fields.reporting_agent = Some(value.to_string()),
                "received-from-mta" => fields.received_from_agent = Some(value.to_string()),
                "arrival-date" => fields.arrival_date = parse_date(value),
                "original-envelope-id" => fields.original_envelope_id = Some(value.to_string()),
                "dsn-gateway" => fields.dsn_gateway = Some(value.to_string()),
                "original-recipient" => {
                    pending_original_recipient = Some(recipient_address(value));
                }
                "final-recipient" => {
                    let block = RecipientBlock::new(value, pending_original_recipient.take());
                    let terminator = self.parse_recipients(
                        reader,
                        boundary,
                        block,
                        &mut raw_report_block,
                        &mut status_by_recipient,
                    )?;
                    return Ok(ReportSection {
                        fields,
                        status_by_recipient,
                        raw_report_block,
                        terminator,
                    });
                }
                _ => tracing::trace!("ignoring per-message field {name}: {value}"),
            }
        }

        Ok(ReportSection {
            fields,
            status_by_recipient,
            raw_report_block,
            terminator: None,
        })
    }

    /// Consume recipient blocks until the boundary or end of input,
    /// returning the boundary line if there was one
    fn parse_recipients<'a>(
        &self,
        reader: &mut LineReader<'a>,
        boundary: &str,
        mut block: RecipientBlock,
        raw_report_block: &mut String,
        status_by_recipient: &mut BTreeMap<String, Status>,
    ) -> Result<Option<LogicalLine<'a>>, StatusError> {
        loop {
            let line = match reader.next_logical_line() {
                Some(line) if !is_boundary(line.text(), boundary) => line,
                terminator => {
                    self.finish_block(block, status_by_recipient)?;
                    return Ok(terminator);
                }
            };
            raw_report_block.push_str(line.raw());

            if line.is_blank() {
                block.seen_blank = true;
                continue;
            }

            let Some((name, value)) = split_field(line.text()) else {
                continue;
            };

            if name.eq_ignore_ascii_case("final-recipient") {
                let next = RecipientBlock::new(value, block.next_original_recipient.take());
                self.finish_block(std::mem::replace(&mut block, next), status_by_recipient)?;
            } else {
                block.apply(name, value);
            }
        }
    }

    fn finish_block(
        &self,
        block: RecipientBlock,
        status_by_recipient: &mut BTreeMap<String, Status>,
    ) -> Result<(), StatusError> {
        let status = block.fields.build_with(&self.patterns)?;
        if status_by_recipient
            .insert(block.recipient.clone(), status)
            .is_some()
        {
            tracing::debug!("recipient {} reported more than once", block.recipient);
        }
        Ok(())
    }

    /// Look for the part holding the original message (or its headers)
    /// and collect its headers
    fn original_message_headers(
        &self,
        reader: &mut LineReader<'_>,
        boundary: &str,
        terminator: Option<LogicalLine<'_>>,
    ) -> Vec<(String, String)> {
        let mut headers = vec![];

        let mut current = terminator.map(|line| line.text().to_string());
        let mut boundaries_seen = 0;
        loop {
            let Some(line) = current
                .take()
                .or_else(|| reader.next_logical_line().map(|l| l.text().to_string()))
            else {
                tracing::trace!("original message part not found");
                return headers;
            };
            if announces(&line, ORIGINAL_MESSAGE_TYPES) {
                break;
            }
            if is_boundary(&line, boundary) {
                boundaries_seen += 1;
                if boundaries_seen > self.original_message_part_limit {
                    tracing::trace!("original message part not found within limit");
                    return headers;
                }
            }
        }

        // Before the first blank line are the headers of the MIME part
        // itself, which we don't want to report as headers of the
        // original message
        let mut in_part_headers = true;
        while let Some(line) = reader.next_logical_line() {
            if is_boundary(line.text(), boundary) {
                break;
            }
            if line.is_blank() {
                if in_part_headers || headers.is_empty() {
                    // Either the part header separator or a stray blank
                    // line ahead of the original headers
                    in_part_headers = false;
                    continue;
                }
                // The separator between the original headers and body
                break;
            }
            let Some((name, value)) = split_field(line.text()) else {
                continue;
            };
            if in_part_headers && starts_with_ignore_case(name, "content-") {
                continue;
            }
            headers.push((name.to_string(), value.to_string()));
        }

        headers
    }
}

/// Advance past the first boundary, then on to the delivery-status
/// part: either its `Content-Type` line or the next boundary.
/// Returns false if the input ends first.
fn seek_delivery_status(reader: &mut LineReader<'_>, boundary: &str) -> bool {
    let mut seen_first_boundary = false;
    while let Some(line) = reader.next_logical_line() {
        let text = line.text();
        if !seen_first_boundary {
            seen_first_boundary = is_boundary(text, boundary);
            continue;
        }
        if is_boundary(text, boundary) || announces(text, DELIVERY_STATUS_TYPES) {
            return true;
        }
    }
    false
}

/// The `Date` header from the top level headers of the report
fn report_date(message: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let mut reader = LineReader::new(message);
    while let Some(line) = reader.next_logical_line() {
        if line.is_blank() {
            break;
        }
        if let Some((name, value)) = split_field(line.text()) {
            if name.eq_ignore_ascii_case("date") {
                return parse_date(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn announcements() {
        assert!(announces(
            "Content-Type: message/delivery-status",
            DELIVERY_STATUS_TYPES
        ));
        assert!(announces(
            "content-type:message/global-delivery-status; charset=utf-8",
            DELIVERY_STATUS_TYPES
        ));
        assert!(!announces("Content-Type: text/plain", DELIVERY_STATUS_TYPES));
        assert!(announces(
            "Content-Type: text/rfc822-headers",
            ORIGINAL_MESSAGE_TYPES
        ));
        assert!(announces("Content-Type: message/rfc822", ORIGINAL_MESSAGE_TYPES));
        // message/global must not match message/global-delivery-status
        assert!(!announces(
            "Content-Type: message/global-delivery-status",
            ORIGINAL_MESSAGE_TYPES
        ));
        assert!(!announces("Content", ORIGINAL_MESSAGE_TYPES));
    }

    #[test]
    fn recipient_addresses() {
        k9::assert_equal!(recipient_address("rfc822; a@example.com"), "a@example.com");
        k9::assert_equal!(recipient_address("RFC822;b@example.com "), "b@example.com");
        k9::assert_equal!(recipient_address("unknown; nair_s"), "unknown; nair_s");
        k9::assert_equal!(recipient_address("c@example.com"), "c@example.com");
    }
}
