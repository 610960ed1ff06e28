use common::err_context::ErrorContextExt;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::ports::secondary::{TokenStorage, TokenStorageError};
use crate::domain::{ConfirmationToken, EmailAddress};

/// Mints and persists confirmation tokens.
///
/// A token is durable before it is ever put into a message: `issue`
/// only returns once the record has been stored, so no email can
/// reference a token that does not exist.
pub struct TokenIssuer {
    tokens: Arc<dyn TokenStorage + Send + Sync>,
    invalidate_prior: bool,
}

impl TokenIssuer {
    pub fn new(tokens: Arc<dyn TokenStorage + Send + Sync>, invalidate_prior: bool) -> TokenIssuer {
        TokenIssuer {
            tokens,
            invalidate_prior,
        }
    }

    #[tracing::instrument(name = "Issuing a confirmation token", skip(self))]
    pub async fn issue(
        &self,
        user_id: Uuid,
        email: &EmailAddress,
    ) -> Result<ConfirmationToken, Error> {
        if self.invalidate_prior {
            self.tokens
                .delete_tokens_for_email(&user_id, email.as_ref())
                .await
                .context("Could not invalidate prior confirmation tokens")?;
        }

        let token = ConfirmationToken::generate(user_id, email.clone());

        self.tokens
            .store_token(&token)
            .await
            .context("Could not store confirmation token")?;

        Ok(token)
    }
}

#[derive(Debug)]
pub enum Error {
    Storage {
        context: String,
        source: TokenStorageError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage { context, source } => {
                write!(fmt, "Token Storage: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<common::err_context::ErrorContext<TokenStorageError>> for Error {
    fn from(err: common::err_context::ErrorContext<TokenStorageError>) -> Self {
        Error::Storage {
            context: err.0,
            source: err.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::secondary::MockTokenStorage;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;
    use mockall::predicate::*;
    use speculoos::prelude::*;

    fn email_addr() -> EmailAddress {
        EmailAddress::parse(SafeEmail().fake::<String>()).unwrap()
    }

    #[tokio::test]
    async fn issuing_stores_the_token_before_returning_it() {
        let user_id = Uuid::new_v4();
        let email = email_addr();
        let email_clone = email.clone();

        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock
            .expect_store_token()
            .withf(move |token: &ConfirmationToken| {
                token.user_id == user_id && token.email == email_clone
            })
            .return_once(|_| Ok(()));

        let issuer = TokenIssuer::new(Arc::new(tokens_mock), false);

        let token = issuer.issue(user_id, &email).await.expect("issued token");

        assert_that(&token.user_id).is_equal_to(user_id);
        assert_that(&token.email).is_equal_to(email);
    }

    #[tokio::test]
    async fn two_issuances_for_the_same_pair_yield_distinct_tokens() {
        let user_id = Uuid::new_v4();
        let email = email_addr();

        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock.expect_store_token().times(2).returning(|_| Ok(()));

        let issuer = TokenIssuer::new(Arc::new(tokens_mock), false);

        let first = issuer.issue(user_id, &email).await.expect("first token");
        let second = issuer.issue(user_id, &email).await.expect("second token");

        assert_that(&first.token).is_not_equal_to(&second.token);
    }

    #[tokio::test]
    async fn prior_tokens_are_kept_by_default() {
        let user_id = Uuid::new_v4();
        let email = email_addr();

        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock
            .expect_delete_tokens_for_email()
            .never()
            .returning(|_, _| Ok(()));
        tokens_mock.expect_store_token().return_once(|_| Ok(()));

        let issuer = TokenIssuer::new(Arc::new(tokens_mock), false);

        issuer.issue(user_id, &email).await.expect("issued token");
    }

    #[tokio::test]
    async fn prior_tokens_are_invalidated_when_the_policy_says_so() {
        let user_id = Uuid::new_v4();
        let email = email_addr();
        let email_str = email.to_string();

        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock
            .expect_delete_tokens_for_email()
            .withf(move |id: &Uuid, email: &str| *id == user_id && email == email_str)
            .times(1)
            .returning(|_, _| Ok(()));
        tokens_mock.expect_store_token().return_once(|_| Ok(()));

        let issuer = TokenIssuer::new(Arc::new(tokens_mock), true);

        issuer.issue(user_id, &email).await.expect("issued token");
    }

    #[tokio::test]
    async fn a_storage_failure_propagates_and_issues_nothing() {
        let mut tokens_mock = MockTokenStorage::new();
        tokens_mock.expect_store_token().return_once(|_| {
            Err(TokenStorageError::Validation {
                context: "broken".to_string(),
            })
        });

        let issuer = TokenIssuer::new(Arc::new(tokens_mock), false);

        let outcome = issuer.issue(Uuid::new_v4(), &email_addr()).await;

        assert_that(&outcome).is_err();
    }
}
