use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::EmailAddress;

/// A single-use credential proving control of an email address.
///
/// The token value is an opaque 32 character alphanumeric string drawn
/// from a CSPRNG. It is bound at creation time to the owning user and
/// to the address being confirmed, which may differ from the user's
/// current address during an email change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationToken {
    pub token: String,
    pub user_id: Uuid,
    pub email: EmailAddress,
    pub created_at: DateTime<Utc>,
}

impl ConfirmationToken {
    pub fn generate(user_id: Uuid, email: EmailAddress) -> ConfirmationToken {
        ConfirmationToken {
            token: generate_token_value(),
            user_id,
            email,
            created_at: Utc::now(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }
}

/// Generates a token value (32 Alphanumeric String)
fn generate_token_value() -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(32)
        .collect()
}
