use axum::extract::{Json, State};
use axum::http::{header, status::StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use common::err_context::{ErrorContext, ErrorContextExt};
use hyper::header::HeaderMap;
use passwords::{analyzer, scorer};
use secrecy::Secret;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::application::server::AppState;
use crate::authentication::jwt::build_token;
use crate::authentication::password::compute_password_hash;
use crate::authentication::password::Error as PasswordError;
use crate::domain::ports::secondary::UserStorageError;
use crate::domain::user::RegistrationRequest;
use crate::domain::{NewUser, UserEvent};

/// POST handler for user registration
///
/// A stored user triggers a `Registered` event; the confirmation mailer
/// reacts to it by sending the activation email.
#[tracing::instrument(
    name = "User Registration",
    skip(state, request),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, Error> {
    let new_user = NewUser::try_from(request.clone())
        .map_err(|err| Error::InvalidRequest {
            context: "Unable to register new user".to_string(),
            source: err,
        })?;

    if state
        .users
        .email_exists(new_user.email.as_ref())
        .await
        .context("Could not check if the email exists")?
    {
        return Err(Error::DuplicateEmail {
            context: "Unable to register new user".to_string(),
        });
    }

    if state
        .users
        .username_exists(new_user.username.as_ref())
        .await
        .context("Could not check if the username exists")?
    {
        return Err(Error::DuplicateUsername {
            context: "Unable to register new user".to_string(),
        });
    }

    let password_score = scorer::score(&analyzer::analyze(&request.password));
    if password_score < 90f64 {
        return Err(Error::WeakPassword {
            context: "Unable to register new user".to_string(),
        });
    }

    let password_hash = compute_password_hash(Secret::new(request.password))
        .context("Could not hash the password")?;

    let user = state
        .users
        .create_user(&new_user, password_hash)
        .await
        .context("Could not store the new user")?;

    let token = build_token(user.id, &state.secret);
    let id = user.id;

    state.events.publish(UserEvent::Registered { user }).await;

    let resp = RegistrationResp {
        status: "success".to_string(),
        token,
        id: id.to_string(),
    };

    Ok::<_, Error>(resp)
}

/// This is what we return to the user in response to the registration
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResp {
    pub status: String,
    pub token: String,
    pub id: String,
}

impl IntoResponse for RegistrationResp {
    fn into_response(self) -> Response {
        let RegistrationResp {
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

#[derive(Debug)]
pub enum Error {
    InvalidRequest {
        context: String,
        source: String,
    },
    DuplicateEmail {
        context: String,
    },
    DuplicateUsername {
        context: String,
    },
    WeakPassword {
        context: String,
    },
    Password {
        context: String,
        source: PasswordError,
    },
    Data {
        context: String,
        source: UserStorageError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest { context, source } => {
                write!(fmt, "Invalid Request: {context} | {source}")
            }
            Error::DuplicateEmail { context } => {
                write!(fmt, "Duplicate email: {context} ")
            }
            Error::DuplicateUsername { context } => {
                write!(fmt, "Duplicate username: {context} ")
            }
            Error::WeakPassword { context } => {
                write!(fmt, "Weak password: {context} ")
            }
            Error::Password { context, source } => {
                write!(fmt, "Password Error: {context} | {source}")
            }
            Error::Data { context, source } => {
                write!(fmt, "Storage Error: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<UserStorageError>> for Error {
    fn from(err: ErrorContext<UserStorageError>) -> Self {
        Error::Data {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<PasswordError>> for Error {
    fn from(err: ErrorContext<PasswordError>) -> Self {
        Error::Password {
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
            Error::InvalidRequest { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
            Error::DuplicateEmail { context } => {
                state.serialize_field("description", context)?;
            }
            Error::DuplicateUsername { context } => {
                state.serialize_field("description", context)?;
            }
            Error::WeakPassword { context } => {
                state.serialize_field("description", context)?;
            }
            Error::Password { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
            Error::Data { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
        }
        state.end()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            err @ Error::InvalidRequest { .. } => (
                StatusCode::BAD_REQUEST,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::DuplicateEmail { .. } => (
                StatusCode::CONFLICT,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::DuplicateUsername { .. } => (
                StatusCode::CONFLICT,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::WeakPassword { .. } => (
                StatusCode::BAD_REQUEST,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::Password { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::Data { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
        }
    }
}
