use async_trait::async_trait;
use common::err_context::ErrorContext;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use uuid::Uuid;

use crate::domain::ConfirmationToken;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStorage {
    /// Persist a freshly generated confirmation token.
    async fn store_token(&self, token: &ConfirmationToken) -> Result<(), Error>;

    async fn get_token(&self, token: &str) -> Result<Option<ConfirmationToken>, Error>;

    /// Delete a single token, typically after redemption.
    async fn delete_token(&self, token: &str) -> Result<(), Error>;

    /// Delete all outstanding tokens bound to a (user, email) pair.
    async fn delete_tokens_for_email(&self, user_id: &Uuid, email: &str) -> Result<(), Error>;
}

#[serde_as]
#[derive(Debug, Serialize)]
pub enum Error {
    /// Error returned by sqlx
    Database {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: sqlx::Error,
    },
    /// Data store cannot be validated
    Validation {
        context: String,
    },
    /// Connection issue with the database
    Connection {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: sqlx::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database { context, source } => {
                write!(fmt, "Database: {context} | {source}")
            }
            Error::Validation { context } => {
                write!(fmt, "Data: {context}")
            }
            Error::Connection { context, source } => {
                write!(fmt, "Database Connection: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<sqlx::Error>> for Error {
    fn from(err: ErrorContext<sqlx::Error>) -> Self {
        match err.1 {
            sqlx::Error::PoolTimedOut => Error::Connection {
                context: format!("PostgreSQL Storage: Connection Timeout: {}", err.0),
                source: err.1,
            },
            sqlx::Error::Database(_) => Error::Database {
                context: format!("PostgreSQL Storage: Database: {}", err.0),
                source: err.1,
            },
            _ => Error::Connection {
                context: format!(
                    "PostgreSQL Storage: Could not establish a connection: {}",
                    err.0
                ),
                source: err.1,
            },
        }
    }
}
