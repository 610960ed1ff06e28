use axum::extract::{Json, State};
use axum::http::status::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::application::server::AppState;
use crate::authentication::actor::Error as ActorError;
use crate::authentication::{assert_registered, Actor};
use crate::domain::ports::secondary::UserStorageError;
use crate::domain::{EmailAddress, UserEvent};
use common::err_context::{ErrorContext, ErrorContextExt};

/// POST handler for requesting an email change.
///
/// The new address only becomes the account address once the
/// confirmation token sent to it is redeemed; this handler merely
/// validates the request and publishes the event.
#[tracing::instrument(
    name = "Requesting an email change",
    skip(state, request),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
pub async fn change_email(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<EmailChangeRequest>,
) -> Result<impl IntoResponse, Error> {
    let actor_id = assert_registered(&actor).context("Email change")?;

    let email = EmailAddress::parse(request.email).map_err(|err| Error::InvalidRequest {
        context: "Unable to request an email change".to_string(),
        source: err,
    })?;

    let user = state
        .users
        .get_user_by_id(&actor_id)
        .await
        .context("Could not get the acting user")?
        .ok_or_else(|| Error::PermissionDenied {
            context: "Unknown user".to_string(),
        })?;

    if user.email == email {
        return Err(Error::InvalidRequest {
            context: "Unable to request an email change".to_string(),
            source: "The new address is the current one".to_string(),
        });
    }

    state
        .events
        .publish(UserEvent::EmailChangeRequested { user, email })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// This is the information sent by the user to change their email.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EmailChangeRequest {
    pub email: String,
}

#[derive(Debug)]
pub enum Error {
    InvalidRequest {
        context: String,
        source: String,
    },
    PermissionDenied {
        context: String,
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
            Error::PermissionDenied { context } => {
                write!(fmt, "Permission Denied: {context}")
            }
            Error::Data { context, source } => {
                write!(fmt, "Storage Error: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<ActorError>> for Error {
    fn from(err: ErrorContext<ActorError>) -> Self {
        Error::PermissionDenied {
            context: format!("{} | {}", err.0, err.1),
        }
    }
}

impl From<ErrorContext<UserStorageError>> for Error {
    fn from(err: ErrorContext<UserStorageError>) -> Self {
        Error::Data {
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
            Error::PermissionDenied { context } => {
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
            err @ Error::PermissionDenied { .. } => (
                StatusCode::FORBIDDEN,
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
