/// Implementations of the secondary ports: Postgres storage, the email
/// service client, the YAML translation catalog, and the mail queue
/// worker.
pub mod email;
pub mod postgres;
pub mod queue;
pub mod translation;
