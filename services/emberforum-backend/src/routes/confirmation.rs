use axum::extract::{Json, Query, State};
use axum::http::status::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::application::server::AppState;
use crate::domain::ports::secondary::{TokenStorageError, UserStorageError};
use common::err_context::{ErrorContext, ErrorContextExt};

/// POST handler redeeming a confirmation token.
///
/// A known token confirms the owning user's email, records the token's
/// target address as the account address, and deletes the token so it
/// cannot be redeemed twice.
#[tracing::instrument(
    name = "Confirming an email address with a token",
    skip(state),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
pub async fn confirmation(
    State(state): State<AppState>,
    Query(request): Query<ConfirmationRequest>,
) -> Result<Json<ConfirmationResp>, Error> {
    let token = state
        .tokens
        .get_token(&request.token)
        .await
        .context("Could not look up the confirmation token")?;

    match token {
        None => Err(Error::UnknownToken {
            context: "Could not confirm email address".to_string(),
        }),
        Some(token) => {
            state
                .users
                .confirm_user_email(&token.user_id, &token.email)
                .await
                .context("Could not confirm the user's email")?;

            state
                .tokens
                .delete_token(token.as_str())
                .await
                .context("Could not delete the redeemed token")?;

            let resp = ConfirmationResp {
                status: "OK".to_string(),
            };
            Ok(Json(resp))
        }
    }
}

/// This is what we return to the user in response to the confirmation
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationResp {
    pub status: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConfirmationRequest {
    pub token: String,
}

#[derive(Debug)]
pub enum Error {
    UnknownToken {
        context: String,
    },
    TokenData {
        context: String,
        source: TokenStorageError,
    },
    UserData {
        context: String,
        source: UserStorageError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownToken { context } => {
                write!(fmt, "Unknown Token: {context}")
            }
            Error::TokenData { context, source } => {
                write!(fmt, "Token Storage Error: {context} | {source}")
            }
            Error::UserData { context, source } => {
                write!(fmt, "User Storage Error: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<TokenStorageError>> for Error {
    fn from(err: ErrorContext<TokenStorageError>) -> Self {
        Error::TokenData {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<UserStorageError>> for Error {
    fn from(err: ErrorContext<UserStorageError>) -> Self {
        Error::UserData {
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
            Error::UnknownToken { context } => {
                state.serialize_field("description", context)?;
            }
            Error::TokenData { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
            Error::UserData { context, source: _ } => {
                state.serialize_field("description", context)?;
            }
        }
        state.end()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            err @ Error::UnknownToken { .. } => (
                StatusCode::UNAUTHORIZED,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::TokenData { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
            err @ Error::UserData { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::to_string(&err).unwrap(),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{post, Router},
    };
    use fake::Fake;
    use mockall::predicate::*;
    use secrecy::Secret;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::{
        application::server::AppState,
        authentication::password::Authenticator,
        domain::ports::secondary::{MockEmailService, MockMailQueue, MockTokenStorage, MockUserStorage},
        domain::{ConfirmationToken, EmailAddress, EventBus},
        mailer::{
            EmailConfirmationMailer, MailGateway, MessageComposer, TokenIssuer, UrlGenerator,
        },
        services::translation::CatalogTranslator,
    };
    use common::settings::DispatchMode;

    use super::*;

    /// This is a helper function to build an App with axum.
    fn confirmation_route() -> Router<AppState> {
        Router::new().route("/api/v1/users/confirmation", post(confirmation))
    }

    fn app_state(users_mock: MockUserStorage, tokens_mock: MockTokenStorage) -> AppState {
        let mailer = EmailConfirmationMailer::new(
            TokenIssuer::new(Arc::new(MockTokenStorage::new()), false),
            MessageComposer::new(
                Arc::new(CatalogTranslator::bundled()),
                UrlGenerator::new("https://forum.example.com"),
                "Ember Forum",
            ),
            MailGateway::new(
                Arc::new(MockEmailService::new()),
                Arc::new(MockMailQueue::new()),
                DispatchMode::Now,
            ),
        );
        AppState {
            users: Arc::new(users_mock),
            tokens: Arc::new(tokens_mock),
            events: Arc::new(EventBus::new()),
            mailer: Arc::new(mailer),
            authenticator: Arc::new(Authenticator {
                storage: Arc::new(MockUserStorage::new()),
            }),
            secret: Secret::new("secret".to_string()),
        }
    }

    fn send_confirmation_request(token: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/users/confirmation?token={token}"))
            .method("POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn a_known_token_confirms_the_user_and_is_deleted() {
        let token_value = 32.fake::<String>();
        let user_id = Uuid::new_v4();
        let email = EmailAddress::parse("new@example.com".to_string()).unwrap();
        let token = ConfirmationToken {
            token: token_value.clone(),
            user_id,
            email: email.clone(),
            created_at: chrono::Utc::now(),
        };

        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock
            .expect_get_token()
            .withf({
                let token_value = token_value.clone();
                move |t: &str| t == token_value
            })
            .return_once(move |_| Ok(Some(token)));
        tokens_mock
            .expect_delete_token()
            .withf({
                let token_value = token_value.clone();
                move |t: &str| t == token_value
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut users_mock = MockUserStorage::new();
        users_mock
            .expect_confirm_user_email()
            .withf(move |id: &Uuid, addr: &EmailAddress| *id == user_id && *addr == email)
            .times(1)
            .returning(|_, _| Ok(()));

        let app = confirmation_route().with_state(app_state(users_mock, tokens_mock));

        let response = app
            .oneshot(send_confirmation_request(&token_value))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn an_unknown_token_is_rejected_and_nothing_is_confirmed() {
        let token_value = 32.fake::<String>();

        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock
            .expect_get_token()
            .return_once(move |_| Ok(None));
        tokens_mock
            .expect_delete_token()
            .never()
            .returning(|_| Ok(()));

        let mut users_mock = MockUserStorage::new();
        users_mock
            .expect_confirm_user_email()
            .never()
            .returning(|_, _| Ok(()));

        let app = confirmation_route().with_state(app_state(users_mock, tokens_mock));

        let response = app
            .oneshot(send_confirmation_request(&token_value))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
