use async_trait::async_trait;
use chrono::Utc;
use common::err_context::ErrorContextExt;
use secrecy::{ExposeSecret, Secret};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStorage;
use crate::domain::ports::secondary::{UserStorage, UserStorageError};
use crate::domain::{EmailAddress, NewUser, User, Username};

#[async_trait]
impl UserStorage for PostgresStorage {
    #[tracing::instrument(name = "Storing a new user in postgres", skip(self, password_hash))]
    async fn create_user(
        &self,
        user: &NewUser,
        password_hash: Secret<String>,
    ) -> Result<User, UserStorageError> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"INSERT INTO main.users (id, username, email, password_hash, email_confirmed, created_at)
               VALUES ($1, $2, $3, $4, FALSE, $5)
               RETURNING id, username, email, email_confirmed"#,
        )
        .bind(id)
        .bind(user.username.as_ref())
        .bind(user.email.as_ref())
        .bind(password_hash.expose_secret())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context(format!(
            "Could not store new user {}",
            user.username.as_ref()
        ))?;

        user_from_row(&row)
    }

    #[tracing::instrument(name = "Fetching a user by id in postgres", skip(self))]
    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, UserStorageError> {
        let row = sqlx::query(
            r#"SELECT id, username, email, email_confirmed FROM main.users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Could not get user for {id}"))?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    #[tracing::instrument(name = "Fetching credentials in postgres", skip(self))]
    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(Uuid, Secret<String>)>, UserStorageError> {
        let row = sqlx::query(r#"SELECT id, password_hash FROM main.users WHERE username = $1"#)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Could not get credentials for {username}"))?;

        row.map(|row| {
            let id: Uuid = row
                .try_get("id")
                .context("Could not extract the user id")?;
            let password_hash: String = row
                .try_get("password_hash")
                .context("Could not extract the password hash")?;
            Ok((id, Secret::new(password_hash)))
        })
        .transpose()
    }

    #[tracing::instrument(name = "Checking email existence in postgres", skip(self))]
    async fn email_exists(&self, email: &str) -> Result<bool, UserStorageError> {
        let row = sqlx::query(r#"SELECT 1 AS one FROM main.users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Could not check email {email}"))?;
        Ok(row.is_some())
    }

    #[tracing::instrument(name = "Checking username existence in postgres", skip(self))]
    async fn username_exists(&self, username: &str) -> Result<bool, UserStorageError> {
        let row = sqlx::query(r#"SELECT 1 AS one FROM main.users WHERE username = $1"#)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Could not check username {username}"))?;
        Ok(row.is_some())
    }

    #[tracing::instrument(name = "Confirming a user's email in postgres", skip(self))]
    async fn confirm_user_email(
        &self,
        id: &Uuid,
        email: &EmailAddress,
    ) -> Result<(), UserStorageError> {
        sqlx::query(r#"UPDATE main.users SET email = $1, email_confirmed = TRUE WHERE id = $2"#)
            .bind(email.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Could not confirm email for user {id}"))?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, UserStorageError> {
    let id: Uuid = row.try_get("id").context("Could not extract the user id")?;
    let username: String = row
        .try_get("username")
        .context("Could not extract the username")?;
    let email: String = row
        .try_get("email")
        .context("Could not extract the email")?;
    let email_confirmed: bool = row
        .try_get("email_confirmed")
        .context("Could not extract the confirmation flag")?;

    let username = Username::parse(username).map_err(|err| UserStorageError::Validation {
        context: format!("Invalid username stored in the database: {err}"),
    })?;
    let email = EmailAddress::parse(email).map_err(|err| UserStorageError::Validation {
        context: format!("Invalid email stored in the database: {err}"),
    })?;

    Ok(User {
        id,
        username,
        email,
        email_confirmed,
    })
}
