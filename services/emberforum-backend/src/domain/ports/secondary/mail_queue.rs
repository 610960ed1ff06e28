/// Interface to the deferred-send side of mail dispatch.
use async_trait::async_trait;
use common::err_context::ErrorContext;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::ports::secondary::Email;
use crate::domain::EmailAddress;

#[cfg(test)]
use mockall::predicate::*;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailQueue {
    /// Hand a fully rendered record to the asynchronous worker system.
    async fn enqueue(&self, request: &SendRawEmail) -> Result<(), Error>;
}

/// A serializable deferred send request.
///
/// All localization and placeholder substitution has happened before
/// this record is created; the worker sends the fields verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRawEmail {
    pub email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

impl From<Email> for SendRawEmail {
    fn from(email: Email) -> Self {
        let Email {
            to,
            subject,
            text_content,
            html_content,
        } = email;
        SendRawEmail {
            email: to.to_string(),
            subject,
            body_text: text_content,
            body_html: html_content,
        }
    }
}

/// Map a queued record back onto a transport message, verbatim.
///
/// No re-templating happens here; a record without an HTML body yields
/// a plain-text-only message. The only failure is a recipient address
/// that no longer parses.
pub fn render_for_transport(request: &SendRawEmail) -> Result<Email, String> {
    let to = EmailAddress::parse(request.email.clone())?;
    Ok(Email {
        to,
        subject: request.subject.clone(),
        text_content: request.body_text.clone(),
        html_content: request.body_html.clone(),
    })
}

#[derive(Debug)]
pub enum Error {
    /// The queue backend rejected the record
    Queue {
        context: String,
        source: sqlx::Error,
    },
    /// The record cannot be turned back into a transport message
    Validation { context: String },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Queue { context, source } => {
                write!(fmt, "Mail Queue: {context} | {source}")
            }
            Error::Validation { context } => {
                write!(fmt, "Mail Queue Validation: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<sqlx::Error>> for Error {
    fn from(err: ErrorContext<sqlx::Error>) -> Self {
        Error::Queue {
            context: err.0,
            source: err.1,
        }
    }
}
