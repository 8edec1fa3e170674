//! Session lifecycle events
//!
//! The HTTP layer and the session manager talk through this hub instead of
//! holding references to each other. Handlers registered with
//! [`SessionEvents::on_event`] run synchronously inside the publishing call;
//! broadcast subscribers see the event afterwards.

use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedOut,
    ProfileUpdated { user_id: String },
    /// The backend answered 401/403 to an authenticated request
    Invalidated { status: u16, path: String },
}

type EventHandler = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// Event hub: synchronous handlers plus a broadcast channel for observers
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
    handlers: Arc<RwLock<Vec<EventHandler>>>,
}

impl std::fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEvents")
            .field("subscribers", &self.sender.receiver_count())
            .finish_non_exhaustive()
    }
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Register a handler that runs before [`SessionEvents::notify`] returns
    ///
    /// Handlers must not publish events themselves.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(handler));
    }

    /// Run the synchronous handlers only
    pub fn notify(&self, event: &SessionEvent) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for handler in handlers.iter() {
            handler(event);
        }
    }

    /// Hand the event to broadcast subscribers only; having none is not an error
    pub fn broadcast(&self, event: SessionEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "Published session event"),
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "Session event dropped, no subscribers")
            }
        }
    }

    /// Run the handlers, then broadcast
    pub fn publish(&self, event: SessionEvent) {
        self.notify(&event);
        self.broadcast(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(32)
    }
}
