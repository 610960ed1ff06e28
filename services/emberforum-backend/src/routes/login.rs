use axum::extract::{Json, State};
use axum::http::{header, status::StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use hyper::header::HeaderMap;
use secrecy::Secret;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::application::server::AppState;
use crate::authentication::jwt::build_token;
use crate::authentication::password::Error as PasswordError;
use crate::domain::Credentials;
use common::err_context::{ErrorContext, ErrorContextExt};

/// POST handler for user login
#[tracing::instrument(
    name = "User Login",
    skip(state, request),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, Error> {
    let credentials = Credentials {
        username: request.username,
        password: Secret::new(request.password),
    };

    let id = state
        .authenticator
        .validate_credentials(&credentials)
        .await
        .context("Could not validate credentials")?;

    let token = build_token(id, &state.secret);

    let resp = LoginResp {
        status: "success".to_string(),
        token,
        id: id.to_string(),
    };

    Ok::<_, Error>(resp)
}

/// This is what we return to the user after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResp {
    pub status: String,
    pub token: String,
    pub id: String,
}

impl IntoResponse for LoginResp {
    fn into_response(self) -> Response {
        let LoginResp {
            status: _,
            token,
            id: _,
        } = self.clone();
        let json = serde_json::to_string(&self).unwrap();
        let cookie = Cookie::build("jwt", token)
            .path("/")
            .max_age(time::Duration::hours(1))
            .same_site(SameSite::Lax)
            .http_only(true)
            .finish();
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, cookie.to_string().parse().unwrap());
        (StatusCode::OK, headers, json).into_response()
    }
}

/// This is the information sent by the user to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub enum Error {
    Credentials {
        context: String,
        source: PasswordError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Credentials { context, source } => {
                write!(fmt, "Authentication Error: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<PasswordError>> for Error {
    fn from(err: ErrorContext<PasswordError>) -> Self {
        Error::Credentials {
            context: err.0,
            source: err.1,
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Error", 1)?;
        match self {
            Error::Credentials { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
        }
        state.end()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            err @ Error::Credentials { .. } => (
                StatusCode::UNAUTHORIZED,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
        }
    }
}
