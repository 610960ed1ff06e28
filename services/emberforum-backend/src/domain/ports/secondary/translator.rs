/// Interface to the translation catalog used for outgoing emails.
use std::collections::HashMap;
use std::fmt;

#[cfg(test)]
use mockall::predicate::*;

/// Black-box translation lookup.
///
/// `translate` resolves a message key to its localized string;
/// `translate_with` additionally substitutes literal `{name}`
/// placeholders with the supplied values.
#[cfg_attr(test, mockall::automock)]
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> Result<String, Error>;

    fn translate_with(
        &self,
        key: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<String, Error>;
}

#[derive(Debug)]
pub enum Error {
    /// The catalog has no entry for the requested key
    MissingKey { context: String },
    /// The catalog itself could not be read
    Catalog { context: String },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingKey { context } => {
                write!(fmt, "Missing translation key: {context}")
            }
            Error::Catalog { context } => {
                write!(fmt, "Translation catalog: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}
