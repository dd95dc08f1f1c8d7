use crate::decode::decode_header_value;
use crate::Status;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A parsed delivery status notification
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Free for the caller to use; parsing never sets it
    pub id: Option<String>,
    pub(crate) date: Option<DateTime<Utc>>,
    pub(crate) reporting_agent: String,
    pub(crate) received_from_agent: Option<String>,
    pub(crate) arrival_date: Option<DateTime<Utc>>,
    pub(crate) original_envelope_id: Option<String>,
    pub(crate) dsn_gateway: Option<String>,
    pub(crate) status_by_recipient: BTreeMap<String, Status>,
    pub(crate) raw_report_block: String,
    pub(crate) original_message_headers: Vec<(String, String)>,
}

impl DeliveryReport {
    /// The `Date` header of the report message itself
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    /// The `Reporting-MTA` field, eg: `dns; mx.example.com`
    pub fn reporting_agent(&self) -> &str {
        &self.reporting_agent
    }

    pub fn received_from_agent(&self) -> Option<&str> {
        self.received_from_agent.as_deref()
    }

    pub fn arrival_date(&self) -> Option<DateTime<Utc>> {
        self.arrival_date
    }

    pub fn original_envelope_id(&self) -> Option<&str> {
        self.original_envelope_id.as_deref()
    }

    pub fn dsn_gateway(&self) -> Option<&str> {
        self.dsn_gateway.as_deref()
    }

    pub fn status_by_recipient(&self) -> &BTreeMap<String, Status> {
        &self.status_by_recipient
    }

    pub fn status_for(&self, recipient: &str) -> Option<&Status> {
        self.status_by_recipient.get(recipient)
    }

    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.status_by_recipient.keys().map(|k| k.as_str())
    }

    /// The text of the delivery-status part, as it appeared in the message
    pub fn raw_report_block(&self) -> &str {
        &self.raw_report_block
    }

    /// The headers of the returned original message, in order, with
    /// any duplicates preserved
    pub fn original_message_headers(&self) -> &[(String, String)] {
        &self.original_message_headers
    }

    /// Returns the first original message header named `name`,
    /// ignoring case
    pub fn original_header(&self, name: &str) -> Option<&str> {
        self.original_message_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The original message headers with encoded-word values decoded.
    /// Values that cannot be decoded are returned as-is.
    pub fn decoded_original_headers(&self) -> Vec<(String, String)> {
        self.original_message_headers
            .iter()
            .map(|(name, value)| {
                let value = match decode_header_value(value) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(err) => {
                        tracing::debug!("leaving {name} undecoded: {err:#}");
                        value.clone()
                    }
                };
                (name.clone(), value)
            })
            .collect()
    }
}
