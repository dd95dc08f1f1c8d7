//! This crate extracts per-recipient delivery outcomes from RFC 3464
//! delivery status notifications (bounces, delay notices and the like).
//!
//! ```
//! let message = "Return-path: <>\r\nSubject: hello\r\n\r\nbody\r\n";
//! assert!(!dsn_report::is_dsn(message));
//! assert!(dsn_report::try_create(message).unwrap().is_none());
//! ```
use std::sync::LazyLock;

mod config;
mod date;
mod decode;
mod detect;
mod error;
mod lines;
mod parse;
mod report;
mod status;

pub use config::{DiagnosticPatterns, DsnParserConfig};
pub use date::parse_date;
pub use decode::decode_header_value;
pub use detect::is_dsn;
pub use enhanced_status::{
    classification_string, classify, StatusClass, StatusCodeClassification, StatusDetail,
    StatusSubject,
};
pub use error::{ConfigError, DsnError, HeaderDecodeError, StatusError};
pub use parse::DsnParser;
pub use report::DeliveryReport;
pub use status::{ReportAction, Status, StatusBuilder};

static DEFAULT_PARSER: LazyLock<DsnParser> = LazyLock::new(DsnParser::default);

/// Parse `message` using the default configuration.
/// See [DsnParser::try_create].
pub fn try_create(message: &str) -> Result<Option<DeliveryReport>, DsnError> {
    DEFAULT_PARSER.try_create(message)
}
