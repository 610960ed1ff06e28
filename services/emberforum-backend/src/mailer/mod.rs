/// Confirmation email orchestration: token issuance, message
/// composition, and dispatch, wired to the domain events that need it.
pub mod composer;
pub mod gateway;
pub mod issuer;
pub mod urls;

pub use composer::{MessageComposer, MessageKind};
pub use gateway::MailGateway;
pub use issuer::TokenIssuer;
pub use urls::UrlGenerator;

use async_trait::async_trait;
use common::err_context::{ErrorContext, ErrorContextExt};
use std::fmt;

use crate::domain::{EmailAddress, EventHandler, User, UserEvent};

/// Reacts to account lifecycle events by sending confirmation emails.
///
/// Within one invocation, token issuance strictly precedes composition,
/// which strictly precedes dispatch; the URL needs the token and the
/// send needs the rendered body. Nothing is rolled back on a failed
/// send: the token stays valid and a later resend mints a fresh one.
pub struct EmailConfirmationMailer {
    issuer: TokenIssuer,
    composer: MessageComposer,
    gateway: MailGateway,
}

impl EmailConfirmationMailer {
    pub fn new(
        issuer: TokenIssuer,
        composer: MessageComposer,
        gateway: MailGateway,
    ) -> EmailConfirmationMailer {
        EmailConfirmationMailer {
            issuer,
            composer,
            gateway,
        }
    }

    /// Issue a token for the user's current address and send the
    /// account activation message. Callers are responsible for checking
    /// that the account still needs activation.
    #[tracing::instrument(name = "Sending account activation email", skip(self, user))]
    pub async fn send_activation(&self, user: &User) -> Result<(), Error> {
        let token = self
            .issuer
            .issue(user.id, &user.email)
            .await
            .context("Could not issue an activation token")?;

        let email = self
            .composer
            .compose(
                MessageKind::ActivateAccount,
                user.username.as_ref(),
                &user.email,
                token.as_str(),
            )
            .context("Could not compose the activation email")?;

        self.gateway
            .dispatch(email)
            .await
            .context("Could not dispatch the activation email")?;

        Ok(())
    }

    #[tracing::instrument(name = "Handling user registration", skip(self, user))]
    pub async fn when_user_registered(&self, user: &User) -> Result<(), Error> {
        // Accounts pre-verified by an identity provider skip this flow.
        if user.email_confirmed {
            return Ok(());
        }

        self.send_activation(user).await
    }

    #[tracing::instrument(name = "Handling email change request", skip(self, user, email))]
    pub async fn when_email_change_requested(
        &self,
        user: &User,
        email: &EmailAddress,
    ) -> Result<(), Error> {
        let token = self
            .issuer
            .issue(user.id, email)
            .await
            .context("Could not issue an email change token")?;

        let message = self
            .composer
            .compose(
                MessageKind::ConfirmEmail,
                user.username.as_ref(),
                email,
                token.as_str(),
            )
            .context("Could not compose the email change confirmation")?;

        self.gateway
            .dispatch(message)
            .await
            .context("Could not dispatch the email change confirmation")?;

        Ok(())
    }
}

#[async_trait]
impl EventHandler for EmailConfirmationMailer {
    async fn handle(
        &self,
        event: &UserEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            UserEvent::Registered { user } => {
                self.when_user_registered(user).await?;
            }
            UserEvent::EmailChangeRequested { user, email } => {
                self.when_email_change_requested(user, email).await?;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Error {
    Token {
        context: String,
        source: issuer::Error,
    },
    Composition {
        context: String,
        source: composer::Error,
    },
    Dispatch {
        context: String,
        source: gateway::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Token { context, source } => {
                write!(fmt, "Token Issuance: {context} | {source}")
            }
            Error::Composition { context, source } => {
                write!(fmt, "Message Composition: {context} | {source}")
            }
            Error::Dispatch { context, source } => {
                write!(fmt, "Mail Dispatch: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<issuer::Error>> for Error {
    fn from(err: ErrorContext<issuer::Error>) -> Self {
        Error::Token {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<composer::Error>> for Error {
    fn from(err: ErrorContext<composer::Error>) -> Self {
        Error::Composition {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<gateway::Error>> for Error {
    fn from(err: ErrorContext<gateway::Error>) -> Self {
        Error::Dispatch {
            context: err.0,
            source: err.1,
        }
    }
}
