use common::err_context::ErrorContext;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;

#[serde_as]
#[derive(Debug, Serialize)]
pub enum Error {
    /// Connection issue with the database
    Connection {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: sqlx::Error,
    },
    Configuration {
        context: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection { context, source } => {
                write!(fmt, "Database Connection: {context} | {source}")
            }
            Error::Configuration { context } => {
                write!(fmt, "Database Configuration: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<sqlx::Error>> for Error {
    fn from(err: ErrorContext<sqlx::Error>) -> Self {
        Error::Connection {
            context: err.0,
            source: err.1,
        }
    }
}
