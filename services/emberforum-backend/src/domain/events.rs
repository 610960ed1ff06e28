use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{EmailAddress, User};

/// Domain events this core reacts to. Producers publish them on the
/// [`EventBus`]; handlers are registered once at startup.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Registered { user: User },
    EmailChangeRequested { user: User, email: EmailAddress },
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &UserEvent)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A fixed-registration, in-process event dispatcher.
///
/// Handlers subscribe before the bus is shared; publishing delivers the
/// event to every handler in registration order. Handler failures are
/// logged and do not affect the publisher or the other handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    #[tracing::instrument(name = "Publishing domain event", skip(self, event))]
    pub async fn publish(&self, event: UserEvent) {
        for handler in &self.handlers {
            if let Err(err) = handler.handle(&event).await {
                tracing::error!("event handler failed: {err}");
            }
        }
    }
}
