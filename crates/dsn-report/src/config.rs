use crate::{ConfigError, DsnParser};
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

const MAILBOX_UNKNOWN: &[&str] = &[
    r"user unknown",
    r"unknown user",
    r"no such (user|mailbox|recipient)",
    r"(mailbox|recipient|address|user) (does not|doesn't) exist",
    r"account (that you tried to reach )?(does not|doesn't) exist",
    r"invalid (recipient|mailbox)",
    r"recipient (address )?rejected",
    r"mailbox (is )?unavailable",
    r"not a (valid|registered) (user|recipient|mailbox)",
];

const MAILBOX_FULL: &[&str] = &[
    r"mailbox (is )?full",
    r"over ?quota",
    r"quota (exceeded|exceeds)",
    r"exceeded (the )?(storage|quota)",
    r"insufficient (storage|disk space)",
    r"mailbox (size|storage) limit",
];

/// Configures a [DsnParser].
///
/// Typically loaded from TOML; any field left out takes its default:
///
/// ```toml
/// mailbox_unknown_patterns = ["no such user", "recipient not found"]
/// original_message_part_limit = 3
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DsnParserConfig {
    /// Case-insensitive regexes matched against the diagnostic text
    /// to detect a mailbox that does not exist
    pub mailbox_unknown_patterns: Vec<String>,
    /// Case-insensitive regexes matched against the diagnostic text
    /// to detect a mailbox that has run out of space
    pub mailbox_full_patterns: Vec<String>,
    /// How many boundary delimited parts to search, after the delivery
    /// status part, for the returned original message
    pub original_message_part_limit: usize,
}

impl Default for DsnParserConfig {
    fn default() -> Self {
        Self {
            mailbox_unknown_patterns: MAILBOX_UNKNOWN.iter().map(|s| s.to_string()).collect(),
            mailbox_full_patterns: MAILBOX_FULL.iter().map(|s| s.to_string()).collect(),
            original_message_part_limit: 2,
        }
    }
}

impl DsnParserConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    pub fn load_toml_file<P: AsRef<Path>>(file_name: P) -> Result<Self, ConfigError> {
        let path = file_name.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data)
    }

    /// Append the patterns from `other`; its part limit replaces ours
    pub fn merge(&mut self, mut other: DsnParserConfig) {
        self.mailbox_unknown_patterns
            .append(&mut other.mailbox_unknown_patterns);
        self.mailbox_full_patterns
            .append(&mut other.mailbox_full_patterns);
        self.original_message_part_limit = other.original_message_part_limit;
    }

    pub fn build(self) -> Result<DsnParser, ConfigError> {
        let patterns =
            DiagnosticPatterns::new(&self.mailbox_unknown_patterns, &self.mailbox_full_patterns)?;
        Ok(DsnParser::with_patterns(
            patterns,
            self.original_message_part_limit,
        ))
    }
}

/// Compiled text patterns used to recognize well known failure
/// reasons in diagnostic text
#[derive(Debug, Clone)]
pub struct DiagnosticPatterns {
    mailbox_unknown: RegexSet,
    mailbox_full: RegexSet,
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<RegexSet, regex::Error> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
}

impl DiagnosticPatterns {
    pub fn new<S: AsRef<str>>(
        mailbox_unknown: &[S],
        mailbox_full: &[S],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            mailbox_unknown: compile(mailbox_unknown)?,
            mailbox_full: compile(mailbox_full)?,
        })
    }

    /// The patterns from [DsnParserConfig::default]
    pub fn builtin() -> &'static Self {
        static BUILTIN: LazyLock<DiagnosticPatterns> = LazyLock::new(|| {
            DiagnosticPatterns::new(MAILBOX_UNKNOWN, MAILBOX_FULL).unwrap()
        });
        &BUILTIN
    }

    pub fn is_mailbox_unknown(&self, diagnostic: &str) -> bool {
        self.mailbox_unknown.is_match(diagnostic)
    }

    pub fn is_mailbox_full(&self, diagnostic: &str) -> bool {
        self.mailbox_full.is_match(diagnostic)
    }
}
