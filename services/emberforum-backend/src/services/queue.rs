use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::secondary::{render_for_transport, EmailService, MailQueueError};
use crate::services::postgres::PostgresStorage;

const BATCH_SIZE: i64 = 32;

/// Poll the mail queue forever, delivering pending records.
///
/// Each record was fully rendered before it was enqueued; the worker
/// maps it verbatim onto a transport message and sends it. A failed
/// send is logged and the record stays pending, so the next poll
/// retries it.
pub async fn run_mail_worker(
    storage: Arc<PostgresStorage>,
    email: Arc<dyn EmailService + Send + Sync>,
    poll_interval: Duration,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        match process_pending(&storage, email.as_ref()).await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Delivered {count} queued emails"),
            Err(err) => tracing::error!("Mail queue poll failed: {err}"),
        }
    }
}

/// Deliver one batch of pending records. Returns how many were sent.
#[tracing::instrument(name = "Processing pending queued emails", skip(storage, email))]
pub async fn process_pending(
    storage: &PostgresStorage,
    email: &(dyn EmailService + Send + Sync),
) -> Result<usize, MailQueueError> {
    let pending = storage.fetch_pending(BATCH_SIZE).await?;

    let mut sent = 0;
    for (id, request) in pending {
        let message = match render_for_transport(&request) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!("Dropping unreadable queued email {id}: {err}");
                storage.mark_sent(&id).await?;
                continue;
            }
        };

        if let Err(err) = email.send_email(message).await {
            tracing::error!("Could not deliver queued email {id}: {err}");
            continue;
        }

        storage.mark_sent(&id).await?;
        sent += 1;
    }

    Ok(sent)
}
