/// Interface to a service for sending email.
use async_trait::async_trait;
use common::err_context::ErrorContext;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::EmailAddress;

#[cfg(test)]
use mockall::predicate::*;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailService {
    async fn send_email(&self, email: Email) -> Result<(), Error>;
}

/// A fully rendered message, ready for transport. Never persisted.
///
/// `html_content` is optional: a message without it is delivered as
/// plain text only, one with it carries the HTML as an alternative part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub to: EmailAddress,
    // from will be filled by the EmailService implementation.
    pub subject: String,
    pub text_content: String,
    pub html_content: Option<String>,
}

#[derive(Debug)]
pub enum Error {
    /// Cannot connect to Email Service
    Connection {
        context: String,
        source: reqwest::Error,
    },
    /// Configuration Error for Email Service Client
    Configuration { context: String },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection { context, source } => {
                write!(fmt, "Email Service Connection: {context} | {source}")
            }
            Error::Configuration { context } => {
                write!(fmt, "Email Service Configuration: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<reqwest::Error>> for Error {
    fn from(err: ErrorContext<reqwest::Error>) -> Self {
        Error::Connection {
            context: err.0,
            source: err.1,
        }
    }
}
