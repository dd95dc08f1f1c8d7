//! Enhanced mail system status codes, as described by RFC 3463.
//!
//! [classify] maps a `class.subject.detail` code onto the taxonomy
//! defined by the RFC, and [resolve_diagnostic_code] digs out codes
//! embedded in diagnostic text that say more than the declared one.
mod classify;
mod error;
mod resolve;

pub use classify::{
    classification_string, classify, Facet, StatusClass, StatusCodeClassification,
    StatusDetail, StatusSubject,
};
pub use error::StatusCodeError;
pub use resolve::{resolve_diagnostic_code, ResolvedCode};
