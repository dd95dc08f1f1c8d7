//! Locate enhanced status codes embedded in free-form diagnostic text,
//! such as the `Diagnostic-Code` field of a delivery status report,
//! and decide whether one of them is more informative than the code
//! that was declared alongside it.
use crate::{classify, StatusCodeClassification};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// A dotted enhanced status code, eg: `5.1.1`
static STRICT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[245]\.[0-7]\.\d{1,3}\b").unwrap());

/// A bare SMTP-ish reply code, eg: `552`
static LOOSE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[245][0-7]\d{1,3}\b").unwrap());

/// A code found in diagnostic text along with its classification
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCode {
    pub code: String,
    pub classification: StatusCodeClassification,
}

/// Reinterpret a run of 3-5 digits as `class.subject.detail`.
/// The detail takes all of the digits after the first two.
fn dotted_from_digits(digits: &str) -> Option<String> {
    if digits.len() < 3 || !digits.is_ascii() {
        return None;
    }
    Some(format!("{}.{}.{}", &digits[0..1], &digits[1..2], &digits[2..]))
}

fn pick_more_specific(
    candidates: impl Iterator<Item = String>,
    declared: &StatusCodeClassification,
) -> Option<ResolvedCode> {
    let mut best: Option<ResolvedCode> = None;

    for code in candidates {
        let classification = match classify(&code) {
            Ok(c) => c,
            Err(err) => {
                tracing::trace!("skipping diagnostic candidate {code}: {err:#}");
                continue;
            }
        };

        let threshold = best
            .as_ref()
            .map(|b| &b.classification)
            .unwrap_or(declared);
        // Strictly greater, so that on a tie the first candidate wins
        if classification.is_more_specific_than(threshold) {
            best.replace(ResolvedCode {
                code,
                classification,
            });
        }
    }

    best
}

/// Scan `diagnostic` for status codes and return the one that is more
/// specific than `declared`, if any.
///
/// Dotted codes are preferred; only when the text contains none of them
/// are bare 3-5 digit reply codes considered.
pub fn resolve_diagnostic_code(
    diagnostic: Option<&str>,
    declared: &StatusCodeClassification,
) -> Option<ResolvedCode> {
    let diagnostic = diagnostic?;

    let strict: Vec<String> = STRICT_CODE
        .find_iter(diagnostic)
        .map(|m| m.as_str().to_string())
        .collect();

    if !strict.is_empty() {
        return pick_more_specific(strict.into_iter(), declared);
    }

    let loose = LOOSE_CODE
        .find_iter(diagnostic)
        .filter_map(|m| dotted_from_digits(m.as_str()));
    pick_more_specific(loose, declared)
}
