use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusCodeError {
    #[error("malformed enhanced status code {0:?}: expected class.subject.detail")]
    Malformed(String),
    #[error("unsupported status class in {0:?}: only 2, 4 and 5 are defined")]
    UnsupportedClass(String),
}
