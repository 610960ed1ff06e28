pub mod application;
pub mod authentication;
pub mod domain;
pub mod mailer;
pub mod routes;
pub mod services;
pub mod telemetry;
