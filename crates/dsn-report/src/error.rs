use enhanced_status::StatusCodeError;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons that a per-recipient [Status](crate::Status) cannot be built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Action field is missing")]
    MissingAction,
    #[error("invalid action type {0}")]
    InvalidAction(String),
    #[error("Status field is missing")]
    MissingStatusCode,
    #[error("status code {0:?} must start with a digit")]
    NonDigitStatusCode(String),
    #[error(transparent)]
    Classification(#[from] StatusCodeError),
}

/// Raised by [DsnParser::try_create](crate::DsnParser::try_create) only
/// when something unexpected went wrong; a message that is not a report,
/// or is a malformed one, is not an error.
#[derive(Error, Debug)]
pub enum DsnError {
    #[error("unexpected failure parsing delivery report: {source:#}")]
    Internal {
        #[source]
        source: anyhow::Error,
        raw_message: String,
    },
}

#[derive(Error, Debug)]
pub enum HeaderDecodeError {
    #[error("unsupported encoded-word in {0:?}")]
    UnsupportedEncoding(String),
    #[error("unterminated encoded-word in {0:?}")]
    Unterminated(String),
    #[error("base64 decode: {0}")]
    Base64(#[from] data_encoding::DecodeError),
    #[error("decoded value is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading file: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding DsnParserConfig: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("compiling patterns: {0}")]
    Pattern(#[from] regex::Error),
}
