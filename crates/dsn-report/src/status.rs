use crate::{DiagnosticPatterns, StatusError};
use chrono::{DateTime, Utc};
use enhanced_status::{
    classify, resolve_diagnostic_code, ResolvedCode, StatusCodeClassification, StatusDetail,
};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    Failed,
    Delayed,
    Delivered,
    Relayed,
    Expanded,
}

impl FromStr for ReportAction {
    type Err = StatusError;
    fn from_str(input: &str) -> Result<Self, StatusError> {
        // Some MTAs append a comment, eg: "failed (bad address)"
        let word = input.split_whitespace().next().unwrap_or("");
        Ok(match word.to_ascii_lowercase().as_str() {
            "failed" => Self::Failed,
            "delayed" => Self::Delayed,
            "delivered" => Self::Delivered,
            "relayed" => Self::Relayed,
            "expanded" => Self::Expanded,
            "" => return Err(StatusError::MissingAction),
            _ => return Err(StatusError::InvalidAction(input.to_string())),
        })
    }
}

/// Accumulates the fields of one per-recipient section before they
/// are validated into a [Status]
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct StatusBuilder {
    pub action: Option<String>,
    pub status: Option<String>,
    pub diagnostic: Option<String>,
    pub will_retry_until: Option<DateTime<Utc>>,
    pub original_recipient: Option<String>,
    pub remote_mta: Option<String>,
    pub last_attempt_date: Option<DateTime<Utc>>,
    pub final_log_id: Option<String>,
}

impl StatusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> Result<Status, StatusError> {
        self.build_with(DiagnosticPatterns::builtin())
    }

    pub fn build_with(self, patterns: &DiagnosticPatterns) -> Result<Status, StatusError> {
        let action: ReportAction = self
            .action
            .as_deref()
            .ok_or(StatusError::MissingAction)?
            .parse()?;

        // The field may carry a trailing comment: "5.0.0 (permanent failure)"
        let declared_code = self
            .status
            .as_deref()
            .and_then(|s| s.split_whitespace().next())
            .ok_or(StatusError::MissingStatusCode)?
            .to_string();
        if !declared_code.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(StatusError::NonDigitStatusCode(declared_code));
        }
        let declared_classification = classify(&declared_code)?;

        let diagnostic = self.diagnostic.filter(|d| !d.trim().is_empty());
        let resolved = resolve_diagnostic_code(diagnostic.as_deref(), &declared_classification);

        let (text_says_unknown, text_says_full) = match diagnostic.as_deref() {
            Some(text) => (
                patterns.is_mailbox_unknown(text),
                patterns.is_mailbox_full(text),
            ),
            None => (false, false),
        };

        Ok(Status {
            action,
            declared_code,
            declared_classification,
            diagnostic,
            resolved,
            will_retry_until: self.will_retry_until,
            original_recipient: self.original_recipient,
            remote_mta: self.remote_mta,
            last_attempt_date: self.last_attempt_date,
            final_log_id: self.final_log_id,
            text_says_unknown,
            text_says_full,
        })
    }
}

/// The outcome of delivery to a single recipient
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Status {
    action: ReportAction,
    declared_code: String,
    declared_classification: StatusCodeClassification,
    diagnostic: Option<String>,
    /// A code found in the diagnostic text that is more specific than
    /// the declared code
    resolved: Option<ResolvedCode>,
    will_retry_until: Option<DateTime<Utc>>,
    original_recipient: Option<String>,
    remote_mta: Option<String>,
    last_attempt_date: Option<DateTime<Utc>>,
    final_log_id: Option<String>,
    #[serde(skip)]
    text_says_unknown: bool,
    #[serde(skip)]
    text_says_full: bool,
}

impl Status {
    pub fn new(
        action: &str,
        status: &str,
        diagnostic: Option<&str>,
    ) -> Result<Self, StatusError> {
        StatusBuilder {
            action: Some(action.to_string()),
            status: Some(status.to_string()),
            diagnostic: diagnostic.map(|s| s.to_string()),
            ..Default::default()
        }
        .build()
    }

    pub fn action(&self) -> ReportAction {
        self.action
    }

    pub fn declared_code(&self) -> &str {
        &self.declared_code
    }

    pub fn declared_classification(&self) -> StatusCodeClassification {
        self.declared_classification
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn resolved_code_override(&self) -> Option<&ResolvedCode> {
        self.resolved.as_ref()
    }

    pub fn will_retry_until(&self) -> Option<DateTime<Utc>> {
        self.will_retry_until
    }

    pub fn original_recipient(&self) -> Option<&str> {
        self.original_recipient.as_deref()
    }

    pub fn remote_mta(&self) -> Option<&str> {
        self.remote_mta.as_deref()
    }

    pub fn last_attempt_date(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_date
    }

    pub fn final_log_id(&self) -> Option<&str> {
        self.final_log_id.as_deref()
    }

    pub fn most_significant_code(&self) -> &str {
        match &self.resolved {
            Some(resolved) => &resolved.code,
            None => &self.declared_code,
        }
    }

    pub fn most_significant_classification(&self) -> StatusCodeClassification {
        match &self.resolved {
            Some(resolved) => resolved.classification,
            None => self.declared_classification,
        }
    }

    pub fn is_delayed(&self) -> bool {
        self.action == ReportAction::Delayed
    }

    /// A delayed message whose retry window has already closed
    fn is_expired_delay(&self, now: DateTime<Utc>) -> bool {
        self.is_delayed() && self.will_retry_until.is_some_and(|until| until <= now)
    }

    pub fn is_permanent_failure_at(&self, now: DateTime<Utc>) -> bool {
        self.most_significant_classification().is_permanent() || self.is_expired_delay(now)
    }

    pub fn is_permanent_failure(&self) -> bool {
        self.is_permanent_failure_at(Utc::now())
    }

    pub fn is_temporary_failure_at(&self, now: DateTime<Utc>) -> bool {
        self.most_significant_classification().is_transient() && !self.is_expired_delay(now)
    }

    pub fn is_temporary_failure(&self) -> bool {
        self.is_temporary_failure_at(Utc::now())
    }

    fn has_detail(&self, detail: StatusDetail) -> bool {
        self.declared_classification.contains(detail)
            || self
                .resolved
                .as_ref()
                .is_some_and(|r| r.classification.contains(detail))
    }

    pub fn is_mailbox_unknown(&self) -> bool {
        self.has_detail(StatusDetail::BadDestinationMailboxAddress) || self.text_says_unknown
    }

    pub fn is_mailbox_full(&self) -> bool {
        self.has_detail(StatusDetail::MailboxFull) || self.text_says_full
    }
}
