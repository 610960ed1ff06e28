/// This module holds the webserver specific details,
/// in our case all (most?) the axum related code.
use axum::{
    routing::{get, post, IntoMakeService, Router},
    Server,
};
use hyper::server::conn::AddrIncoming;
use secrecy::Secret;
use std::net::TcpListener;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::authentication::password::Authenticator;
use crate::domain::ports::secondary::{EmailService, MailQueue, TokenStorage, UserStorage};
use crate::domain::EventBus;
use crate::mailer::EmailConfirmationMailer;
use crate::routes::{
    change_email::change_email, confirmation::confirmation, health::health, login::login,
    register::register, send_confirmation::send_confirmation,
};

pub fn new(
    listener: TcpListener,
    users: DynUsers,
    tokens: DynTokens,
    events: Arc<EventBus>,
    mailer: Arc<EmailConfirmationMailer>,
    secret: Secret<String>,
) -> AppServer {
    let authenticator = Arc::new(Authenticator {
        storage: users.clone(),
    });

    // Build app state
    let app_state = AppState {
        users,
        tokens,
        events,
        mailer,
        authenticator,
        secret,
    };

    let router = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/users/send-confirmation", post(send_confirmation))
        .route("/api/v1/users/confirmation", post(confirmation))
        .route("/api/v1/users/email", post(change_email));

    let cors = CorsLayer::permissive();

    let app = Router::new()
        .merge(router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start the axum server and set up to use supplied listener
    axum::Server::from_tcp(listener)
        .expect("failed to create server from listener")
        .serve(app.into_make_service())
}

pub type DynUsers = Arc<dyn UserStorage + Send + Sync>;
pub type DynTokens = Arc<dyn TokenStorage + Send + Sync>;
pub type DynEmail = Arc<dyn EmailService + Send + Sync>;
pub type DynMailQueue = Arc<dyn MailQueue + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub users: DynUsers,
    pub tokens: DynTokens,
    pub events: Arc<EventBus>,
    pub mailer: Arc<EmailConfirmationMailer>,
    pub authenticator: Arc<Authenticator>,
    pub secret: Secret<String>,
}

pub type AppServer = Server<AddrIncoming, IntoMakeService<Router>>;
