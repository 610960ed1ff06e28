use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::application::server::AppState;
use crate::authentication::jwt::validate_token;

/// The identity behind a request. Anything without a valid session
/// token is a guest; extraction itself never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Guest,
    Registered { id: Uuid },
}

impl Actor {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Actor::Guest => None,
            Actor::Registered { id } => Some(*id),
        }
    }
}

/// Authorization check: the actor must be an authenticated, non-guest
/// identity. Returns the actor's user id, or a permission error.
pub fn assert_registered(actor: &Actor) -> Result<Uuid, Error> {
    actor.id().ok_or_else(|| Error::PermissionDenied {
        context: "This action requires a registered user".to_string(),
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Session cookie first, then an Authorization bearer header.
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get("jwt")
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(String::from)
            });

        let actor = token
            .and_then(|token| validate_token(&token, &state.secret))
            .map(|id| Actor::Registered { id })
            .unwrap_or(Actor::Guest);

        Ok(actor)
    }
}

#[derive(Debug, Serialize)]
pub enum Error {
    PermissionDenied { context: String },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PermissionDenied { context } => {
                write!(fmt, "Permission Denied: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}
