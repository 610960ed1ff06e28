use async_trait::async_trait;
use common::err_context::ErrorContext;
use secrecy::Secret;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use uuid::Uuid;

use crate::domain::{EmailAddress, NewUser, User};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStorage {
    /// Store a new user along with their password hash, and return the
    /// stored user.
    async fn create_user(
        &self,
        user: &NewUser,
        password_hash: Secret<String>,
    ) -> Result<User, Error>;

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, Error>;

    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(Uuid, Secret<String>)>, Error>;

    async fn email_exists(&self, email: &str) -> Result<bool, Error>;

    async fn username_exists(&self, username: &str) -> Result<bool, Error>;

    /// Mark the user's email as confirmed, recording `email` as the
    /// confirmed address. This is what completes an email change.
    async fn confirm_user_email(&self, id: &Uuid, email: &EmailAddress) -> Result<(), Error>;
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
    Missing {
        context: String,
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
            Error::Missing { context } => {
                write!(fmt, "Missing: {context}")
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
