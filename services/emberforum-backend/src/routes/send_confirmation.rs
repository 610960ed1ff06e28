use axum::extract::{Query, State};
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
use crate::mailer::Error as MailerError;
use common::err_context::{ErrorContext, ErrorContextExt};

/// POST handler letting a user request a new activation email.
///
/// The actor must be registered, must be asking for their own account,
/// and that account must not be activated yet; any mismatch is a
/// permission error and nothing is issued or sent.
#[tracing::instrument(
    name = "Resending an activation email",
    skip(state),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
pub async fn send_confirmation(
    State(state): State<AppState>,
    actor: Actor,
    Query(request): Query<SendConfirmationRequest>,
) -> Result<impl IntoResponse, Error> {
    let actor_id = assert_registered(&actor).context("Resend activation")?;

    if actor_id != request.id {
        return Err(Error::PermissionDenied {
            context: "A user can only request activation of their own account".to_string(),
        });
    }

    let user = state
        .users
        .get_user_by_id(&actor_id)
        .await
        .context("Could not get the acting user")?
        .ok_or_else(|| Error::PermissionDenied {
            context: "Unknown user".to_string(),
        })?;

    if user.email_confirmed {
        return Err(Error::PermissionDenied {
            context: "This account is already activated".to_string(),
        });
    }

    state
        .mailer
        .send_activation(&user)
        .await
        .context("Could not send the activation email")?;

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters of the resend action: the id of the user whose
/// activation email should be sent again.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SendConfirmationRequest {
    pub id: Uuid,
}

#[derive(Debug)]
pub enum Error {
    PermissionDenied {
        context: String,
    },
    Data {
        context: String,
        source: UserStorageError,
    },
    Mailer {
        context: String,
        source: MailerError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PermissionDenied { context } => {
                write!(fmt, "Permission Denied: {context}")
            }
            Error::Data { context, source } => {
                write!(fmt, "Storage Error: {context} | {source}")
            }
            Error::Mailer { context, source } => {
                write!(fmt, "Mailer Error: {context} | {source}")
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

impl From<ErrorContext<MailerError>> for Error {
    fn from(err: ErrorContext<MailerError>) -> Self {
        Error::Mailer {
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
            Error::PermissionDenied { context } => {
                state.serialize_field("description", context)?;
            }
            Error::Data { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
            Error::Mailer { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
        }
        state.end()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
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
            err @ Error::Mailer { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
        }
    }
}
