use common::err_context::{ErrorContext, ErrorContextExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::ports::secondary::{Email, TranslationError, Translator};
use crate::domain::EmailAddress;
use crate::mailer::urls::UrlGenerator;

/// Which of the two confirmation messages to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Initial registration.
    ActivateAccount,
    /// Email change request; rendered for the new address.
    ConfirmEmail,
}

impl MessageKind {
    fn template(&self) -> &'static str {
        match self {
            MessageKind::ActivateAccount => "core.email.activate_account",
            MessageKind::ConfirmEmail => "core.email.confirm_email",
        }
    }
}

/// Renders localized confirmation messages.
///
/// Rendering is deterministic given its inputs and the catalog behind
/// the translator: the same substitution data feeds both the plain-text
/// and the HTML body, so mail clients preferring either format see the
/// same content.
pub struct MessageComposer {
    translator: Arc<dyn Translator>,
    urls: UrlGenerator,
    forum_title: String,
}

impl MessageComposer {
    pub fn new(
        translator: Arc<dyn Translator>,
        urls: UrlGenerator,
        forum_title: impl Into<String>,
    ) -> MessageComposer {
        MessageComposer {
            translator,
            urls,
            forum_title: forum_title.into(),
        }
    }

    pub fn compose(
        &self,
        kind: MessageKind,
        username: &str,
        to: &EmailAddress,
        token: &str,
    ) -> Result<Email, Error> {
        let template = kind.template();

        let mut data = HashMap::new();
        data.insert("username".to_string(), username.to_string());
        data.insert("url".to_string(), self.urls.confirm_email(token));
        data.insert("forum".to_string(), self.forum_title.clone());

        let subject = self
            .translator
            .translate(&format!("{template}.subject"))
            .context(format!("Could not render {template} subject"))?;
        let text_content = self
            .translator
            .translate_with(&format!("{template}.body_text"), &data)
            .context(format!("Could not render {template} text body"))?;
        let html_content = self
            .translator
            .translate_with(&format!("{template}.body_html"), &data)
            .context(format!("Could not render {template} html body"))?;

        Ok(Email {
            to: to.clone(),
            subject,
            text_content,
            html_content: Some(html_content),
        })
    }
}

#[derive(Debug)]
pub enum Error {
    Translation {
        context: String,
        source: TranslationError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Translation { context, source } => {
                write!(fmt, "Translation: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<TranslationError>> for Error {
    fn from(err: ErrorContext<TranslationError>) -> Self {
        Error::Translation {
            context: err.0,
            source: err.1,
        }
    }
}
