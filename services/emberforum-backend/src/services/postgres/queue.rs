use async_trait::async_trait;
use chrono::Utc;
use common::err_context::ErrorContextExt;
use sqlx::Row;
use uuid::Uuid;

use super::PostgresStorage;
use crate::domain::ports::secondary::{MailQueue, MailQueueError, SendRawEmail};

#[async_trait]
impl MailQueue for PostgresStorage {
    #[tracing::instrument(name = "Enqueuing a raw email in postgres", skip(self, request))]
    async fn enqueue(&self, request: &SendRawEmail) -> Result<(), MailQueueError> {
        sqlx::query(
            r#"INSERT INTO main.mail_queue (id, email, subject, body_text, body_html, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.subject)
        .bind(&request.body_text)
        .bind(&request.body_html)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context(format!("Could not enqueue email for {}", request.email))?;
        Ok(())
    }
}

impl PostgresStorage {
    /// Fetch queued records that have not been sent yet, oldest first.
    #[tracing::instrument(name = "Fetching pending queued emails", skip(self))]
    pub async fn fetch_pending(
        &self,
        limit: i64,
    ) -> Result<Vec<(Uuid, SendRawEmail)>, MailQueueError> {
        let rows = sqlx::query(
            r#"SELECT id, email, subject, body_text, body_html FROM main.mail_queue
               WHERE sent_at IS NULL ORDER BY created_at ASC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Could not fetch pending queued emails")?;

        rows.into_iter()
            .map(|row| {
                let id: Uuid = row
                    .try_get("id")
                    .context("Could not extract the record id")?;
                let email: String = row
                    .try_get("email")
                    .context("Could not extract the recipient")?;
                let subject: String = row
                    .try_get("subject")
                    .context("Could not extract the subject")?;
                let body_text: String = row
                    .try_get("body_text")
                    .context("Could not extract the text body")?;
                let body_html: Option<String> = row
                    .try_get("body_html")
                    .context("Could not extract the html body")?;
                Ok((
                    id,
                    SendRawEmail {
                        email,
                        subject,
                        body_text,
                        body_html,
                    },
                ))
            })
            .collect()
    }

    /// Mark a queued record as sent so it is not picked up again.
    #[tracing::instrument(name = "Marking a queued email as sent", skip(self))]
    pub async fn mark_sent(&self, id: &Uuid) -> Result<(), MailQueueError> {
        sqlx::query(r#"UPDATE main.mail_queue SET sent_at = $1 WHERE id = $2"#)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Could not mark queued email {id} as sent"))?;
        Ok(())
    }
}
