mod listener;
pub mod opts;
pub mod server;

use common::err_context::{ErrorContext, ErrorContextExt};
use common::settings::{
    ApplicationSettings, ConfirmationSettings, DatabaseSettings, EmailClientSettings,
    ForumSettings, Settings,
};
use secrecy::Secret;
use std::fmt;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use self::listener::listen_with_host_port;
use self::server::{AppServer, DynEmail, DynMailQueue, DynTokens, DynUsers};
use crate::domain::ports::secondary::{EmailError, TranslationError, Translator};
use crate::domain::EventBus;
use crate::mailer::{
    EmailConfirmationMailer, MailGateway, MessageComposer, TokenIssuer, UrlGenerator,
};
use crate::services::email::EmailClient;
use crate::services::postgres::{Error as StorageError, PostgresStorage};
use crate::services::queue::run_mail_worker;
use crate::services::translation::CatalogTranslator;

pub struct Application {
    port: u16,
    server: AppServer,
    storage: Arc<PostgresStorage>,
    email: DynEmail,
    queue_poll: Duration,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the HTTP server, with the mail queue worker polling in the
    /// background, until either fails.
    pub async fn run_until_stopped(self) -> Result<(), Error> {
        tokio::spawn(run_mail_worker(
            self.storage.clone(),
            self.email.clone(),
            self.queue_poll,
        ));
        self.server.await.context("server execution error")?;
        Ok(())
    }
}

#[derive(Default)]
pub struct ApplicationBuilder {
    pub storage: Option<Arc<PostgresStorage>>,
    pub email: Option<DynEmail>,
    pub translator: Option<Arc<dyn Translator>>,
    pub listener: Option<TcpListener>,
    pub port: Option<u16>,
    pub url: Option<String>,
    pub forum: Option<ForumSettings>,
    pub confirmation: Option<ConfirmationSettings>,
    pub secret: Option<Secret<String>>,
}

impl ApplicationBuilder {
    pub async fn new(settings: Settings) -> Result<Self, Error> {
        let Settings {
            application,
            database,
            email_client,
            forum,
            confirmation,
            tracing: _,
            mode: _,
        } = settings;
        let builder = Self::default()
            .storage(database)
            .await?
            .email(email_client)
            .await?
            .translator(&forum.locale)?
            .listener(application.clone())?
            .port(application.port)
            .url(application.base_url)
            .forum(forum)
            .confirmation(confirmation)
            .secret(application.secret);

        Ok(builder)
    }

    pub async fn storage(mut self, settings: DatabaseSettings) -> Result<Self, Error> {
        let storage = Arc::new(
            PostgresStorage::new(settings)
                .await
                .context("Establishing a database connection")?,
        );
        self.storage = Some(storage);
        Ok(self)
    }

    pub async fn email(mut self, settings: EmailClientSettings) -> Result<Self, Error> {
        let email = Arc::new(
            EmailClient::new(settings)
                .await
                .context("Establishing an email service connection")?,
        );
        self.email = Some(email);
        Ok(self)
    }

    pub fn translator(mut self, locale: &str) -> Result<Self, Error> {
        let translator = Arc::new(
            CatalogTranslator::for_locale(locale)
                .context(format!("Loading the {locale} translation catalog"))?,
        );
        self.translator = Some(translator);
        Ok(self)
    }

    pub fn listener(mut self, settings: ApplicationSettings) -> Result<Self, Error> {
        let listener = listen_with_host_port(settings.host.as_str(), settings.port).context(
            format!(
                "Could not create listener for {}:{}",
                settings.host, settings.port
            ),
        )?;
        self.listener = Some(listener);
        Ok(self)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    pub fn forum(mut self, forum: ForumSettings) -> Self {
        self.forum = Some(forum);
        self
    }

    pub fn confirmation(mut self, confirmation: ConfirmationSettings) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn secret(mut self, secret: String) -> Self {
        self.secret = Some(Secret::new(secret));
        self
    }

    pub fn build(self) -> Application {
        let ApplicationBuilder {
            storage,
            email,
            translator,
            listener,
            port,
            url,
            forum,
            confirmation,
            secret,
        } = self;
        let storage = storage.expect("storage");
        let email = email.expect("email");
        let forum = forum.expect("forum");
        let confirmation = confirmation.expect("confirmation");

        let users: DynUsers = storage.clone();
        let tokens: DynTokens = storage.clone();
        let queue: DynMailQueue = storage.clone();

        let issuer = TokenIssuer::new(tokens.clone(), confirmation.invalidate_prior);
        let composer = MessageComposer::new(
            translator.expect("translator"),
            UrlGenerator::new(url.expect("url")),
            forum.title,
        );
        let gateway = MailGateway::new(email.clone(), queue, confirmation.dispatch);
        let mailer = Arc::new(EmailConfirmationMailer::new(issuer, composer, gateway));

        // Event handlers are wired once, before the bus is shared.
        let mut events = EventBus::new();
        events.subscribe(mailer.clone());
        let events = Arc::new(events);

        let server = server::new(
            listener.expect("listener"),
            users,
            tokens,
            events,
            mailer,
            secret.expect("secret"),
        );

        Application {
            port: port.expect("port"),
            server,
            storage,
            email,
            queue_poll: Duration::from_secs(confirmation.queue_poll_seconds),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Storage {
        context: String,
        source: StorageError,
    },
    Email {
        context: String,
        source: EmailError,
    },
    Translation {
        context: String,
        source: TranslationError,
    },
    Listener {
        context: String,
        source: std::io::Error,
    },
    Server {
        context: String,
        source: hyper::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage { context, source } => {
                write!(fmt, "Storage: {context} | {source}")
            }
            Error::Email { context, source } => {
                write!(fmt, "Email: {context} | {source}")
            }
            Error::Translation { context, source } => {
                write!(fmt, "Translation: {context} | {source}")
            }
            Error::Listener { context, source } => {
                write!(fmt, "Listener: {context} | {source}")
            }
            Error::Server { context, source } => {
                write!(fmt, "Server: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<StorageError>> for Error {
    fn from(err: ErrorContext<StorageError>) -> Self {
        Error::Storage {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<EmailError>> for Error {
    fn from(err: ErrorContext<EmailError>) -> Self {
        Error::Email {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<TranslationError>> for Error {
    fn from(err: ErrorContext<TranslationError>) -> Self {
        Error::Translation {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<std::io::Error>> for Error {
    fn from(err: ErrorContext<std::io::Error>) -> Self {
        Error::Listener {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<hyper::Error>> for Error {
    fn from(err: ErrorContext<hyper::Error>) -> Self {
        Error::Server {
            context: err.0,
            source: err.1,
        }
    }
}
