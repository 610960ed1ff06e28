use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgSslMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    /// Public base URL of the forum, used to build links embedded in emails.
    pub base_url: String,
    /// Key used to sign session tokens.
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
    pub connection_timeout: u64,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            // Try an encrypted connection, fallback
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database_name)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClientSettings {
    /// URL of the Email Service the client connects to.
    pub server_url: String,
    pub sender_email: String,
    pub authorization_token: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumSettings {
    /// Display title of the forum, substituted into email templates.
    pub title: String,
    /// Locale of the translation catalog used for outgoing emails.
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    /// When true, issuing a new confirmation token deletes prior
    /// outstanding tokens for the same (user, email) pair.
    pub invalidate_prior: bool,
    /// How rendered confirmation emails leave the application:
    /// "now" sends inline, "queued" goes through the mail queue.
    pub dispatch: DispatchMode,
    /// Seconds between two polls of the mail queue.
    pub queue_poll_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    Now,
    Queued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JaegerSettings {
    pub service_name: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingSettings {
    pub level: String,
    pub jaeger: Option<JaegerSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub forum: ForumSettings,
    pub confirmation: ConfirmationSettings,
    pub tracing: TracingSettings,
    pub mode: String,
}
