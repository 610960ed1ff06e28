pub mod email_service;
pub mod mail_queue;
pub mod token_storage;
pub mod translator;
pub mod user_storage;

pub use email_service::{Email, EmailService, Error as EmailError};
pub use mail_queue::{render_for_transport, MailQueue, SendRawEmail, Error as MailQueueError};
pub use token_storage::{Error as TokenStorageError, TokenStorage};
pub use translator::{Error as TranslationError, Translator};
pub use user_storage::{Error as UserStorageError, UserStorage};

#[cfg(test)]
pub use email_service::MockEmailService;

#[cfg(test)]
pub use mail_queue::MockMailQueue;

#[cfg(test)]
pub use token_storage::MockTokenStorage;

#[cfg(test)]
pub use translator::MockTranslator;

#[cfg(test)]
pub use user_storage::MockUserStorage;
