//! SessionGate: decides between the login screen and the home shell.
//!
//! Seeds `logged_in` from the session store, listens for `login` on the bus
//! while active, and kicks off the backend handshake once at activation.

use std::sync::Arc;

use laud_proto::nav::NavState;
use laud_proto::protocol::TOPIC_LOGIN;
use tracing::{info, warn};

use crate::bus::MessageBus;
use crate::engine::SessionStore;
use crate::registration::Registration;

pub struct SessionGate {
    store: Arc<dyn SessionStore>,
    subscription: Option<Registration>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            subscription: None,
        }
    }

    /// Navigation state to start from.
    pub fn initial_state(&self) -> NavState {
        NavState::new(self.store.is_logged_in())
    }

    /// Subscribe to `login` and start the handshake.  Must run inside a tokio
    /// runtime.  Activating twice keeps the first subscription.
    pub fn activate(&mut self, bus: &MessageBus, on_login: impl Fn() + Send + Sync + 'static) {
        if self.is_active() {
            warn!("session gate already active");
            return;
        }
        self.subscription = Some(bus.subscribe(TOPIC_LOGIN, move |_| on_login()));

        // Fire-and-forget; the store reports its own failures.
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.login().await {
                Ok(()) => info!("session handshake complete"),
                Err(e) => warn!("session handshake failed: {}", e),
            }
        });
    }

    pub fn is_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    /// A `login` event only flips `logged_in`; tab and overlay stay put.
    pub fn on_login(&self, state: NavState) -> NavState {
        NavState {
            logged_in: true,
            ..state
        }
    }

    pub fn deactivate(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.release();
        }
    }
}
