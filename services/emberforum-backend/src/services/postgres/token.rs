use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::err_context::ErrorContextExt;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStorage;
use crate::domain::ports::secondary::{TokenStorage, TokenStorageError};
use crate::domain::{ConfirmationToken, EmailAddress};

#[async_trait]
impl TokenStorage for PostgresStorage {
    #[tracing::instrument(name = "Storing a confirmation token in postgres", skip(self, token))]
    async fn store_token(&self, token: &ConfirmationToken) -> Result<(), TokenStorageError> {
        sqlx::query(
            r#"INSERT INTO main.email_tokens (token, user_id, email, created_at)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.email.as_ref())
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .context(format!(
            "Could not store confirmation token for user {}",
            token.user_id
        ))?;
        Ok(())
    }

    #[tracing::instrument(name = "Fetching a confirmation token in postgres", skip(self, token))]
    async fn get_token(&self, token: &str) -> Result<Option<ConfirmationToken>, TokenStorageError> {
        let row = sqlx::query(
            r#"SELECT token, user_id, email, created_at FROM main.email_tokens WHERE token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Could not get confirmation token")?;

        row.map(|row| {
            let token: String = row
                .try_get("token")
                .context("Could not extract the token value")?;
            let user_id: Uuid = row
                .try_get("user_id")
                .context("Could not extract the user id")?;
            let email: String = row
                .try_get("email")
                .context("Could not extract the email")?;
            let created_at: DateTime<Utc> = row
                .try_get("created_at")
                .context("Could not extract the creation timestamp")?;

            let email =
                EmailAddress::parse(email).map_err(|err| TokenStorageError::Validation {
                    context: format!("Invalid email stored in the database: {err}"),
                })?;

            Ok(ConfirmationToken {
                token,
                user_id,
                email,
                created_at,
            })
        })
        .transpose()
    }

    #[tracing::instrument(name = "Deleting a confirmation token", skip(self, token))]
    async fn delete_token(&self, token: &str) -> Result<(), TokenStorageError> {
        sqlx::query(r#"DELETE FROM main.email_tokens WHERE token = $1"#)
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Could not delete confirmation token")?;
        Ok(())
    }

    #[tracing::instrument(name = "Deleting prior confirmation tokens", skip(self))]
    async fn delete_tokens_for_email(
        &self,
        user_id: &Uuid,
        email: &str,
    ) -> Result<(), TokenStorageError> {
        sqlx::query(r#"DELETE FROM main.email_tokens WHERE user_id = $1 AND email = $2"#)
            .bind(user_id)
            .bind(email)
            .execute(&self.pool)
            .await
            .context(format!(
                "Could not delete confirmation tokens for user {user_id}"
            ))?;
        Ok(())
    }
}
