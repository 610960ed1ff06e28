use common::err_context::{ErrorContext, ErrorContextExt};
use common::settings::DispatchMode;
use std::fmt;
use std::sync::Arc;

use crate::domain::ports::secondary::{
    Email, EmailError, EmailService, MailQueue, MailQueueError, SendRawEmail,
};

/// Abstraction over "send this rendered message to this address".
///
/// `send_now` delivers inline through the email service; `enqueue`
/// hands an already rendered record to the asynchronous worker system.
/// `dispatch` picks between the two according to the configured mode.
pub struct MailGateway {
    email: Arc<dyn EmailService + Send + Sync>,
    queue: Arc<dyn MailQueue + Send + Sync>,
    mode: DispatchMode,
}

impl MailGateway {
    pub fn new(
        email: Arc<dyn EmailService + Send + Sync>,
        queue: Arc<dyn MailQueue + Send + Sync>,
        mode: DispatchMode,
    ) -> MailGateway {
        MailGateway { email, queue, mode }
    }

    #[tracing::instrument(name = "Sending email inline", skip(self, email))]
    pub async fn send_now(&self, email: Email) -> Result<(), Error> {
        self.email
            .send_email(email)
            .await
            .context("Could not deliver email")?;
        Ok(())
    }

    #[tracing::instrument(name = "Enqueuing deferred email", skip(self, request))]
    pub async fn enqueue(&self, request: SendRawEmail) -> Result<(), Error> {
        self.queue
            .enqueue(&request)
            .await
            .context("Could not enqueue email")?;
        Ok(())
    }

    pub async fn dispatch(&self, email: Email) -> Result<(), Error> {
        match self.mode {
            DispatchMode::Now => self.send_now(email).await,
            DispatchMode::Queued => self.enqueue(SendRawEmail::from(email)).await,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Delivery {
        context: String,
        source: EmailError,
    },
    Queue {
        context: String,
        source: MailQueueError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Delivery { context, source } => {
                write!(fmt, "Email Delivery: {context} | {source}")
            }
            Error::Queue { context, source } => {
                write!(fmt, "Mail Queue: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<EmailError>> for Error {
    fn from(err: ErrorContext<EmailError>) -> Self {
        Error::Delivery {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<MailQueueError>> for Error {
    fn from(err: ErrorContext<MailQueueError>) -> Self {
        Error::Queue {
            context: err.0,
            source: err.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::secondary::{MockEmailService, MockMailQueue};
    use crate::domain::EmailAddress;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    fn rendered_email() -> Email {
        Email {
            to: EmailAddress::parse(SafeEmail().fake::<String>()).unwrap(),
            subject: "Activate Your New Account".to_string(),
            text_content: "text".to_string(),
            html_content: Some("html".to_string()),
        }
    }

    #[tokio::test]
    async fn dispatching_in_now_mode_delivers_inline() {
        let mut email_mock = MockEmailService::new();
        email_mock.expect_send_email().times(1).return_once(|_| Ok(()));

        let mut queue_mock = MockMailQueue::new();
        queue_mock.expect_enqueue().never().returning(|_| Ok(()));

        let gateway = MailGateway::new(
            Arc::new(email_mock),
            Arc::new(queue_mock),
            DispatchMode::Now,
        );

        gateway.dispatch(rendered_email()).await.expect("dispatched");
    }

    #[tokio::test]
    async fn dispatching_in_queued_mode_records_the_fields_verbatim() {
        let email = rendered_email();
        let expected = SendRawEmail::from(email.clone());

        let mut email_mock = MockEmailService::new();
        email_mock.expect_send_email().never().returning(|_| Ok(()));

        let mut queue_mock = MockMailQueue::new();
        queue_mock
            .expect_enqueue()
            .withf(move |request: &SendRawEmail| request == &expected)
            .times(1)
            .returning(|_| Ok(()));

        let gateway = MailGateway::new(
            Arc::new(email_mock),
            Arc::new(queue_mock),
            DispatchMode::Queued,
        );

        gateway.dispatch(email).await.expect("dispatched");
    }

    #[tokio::test]
    async fn a_transport_failure_is_not_retried_and_propagates() {
        let mut email_mock = MockEmailService::new();
        email_mock.expect_send_email().times(1).return_once(|_| {
            Err(EmailError::Configuration {
                context: "no sender".to_string(),
            })
        });

        let queue_mock = MockMailQueue::new();

        let gateway = MailGateway::new(
            Arc::new(email_mock),
            Arc::new(queue_mock),
            DispatchMode::Now,
        );

        let outcome = gateway.dispatch(rendered_email()).await;

        assert!(outcome.is_err());
    }
}
