//! MessageBus: process-wide publish/subscribe keyed by topic name.
//!
//! Handlers run synchronously on the publishing task, after the bus lock has
//! been dropped, so a handler may subscribe or publish without deadlocking.
//! Handlers that need to mutate shell state post into the core queue instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use laud_proto::protocol::BusMessage;
use tracing::debug;

use crate::registration::Registration;

type Handler = Arc<dyn Fn(&BusMessage) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    topics: HashMap<String, Vec<(u64, Handler)>>,
}

#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<Mutex<BusInner>>,
}

fn lock(inner: &Mutex<BusInner>) -> MutexGuard<'_, BusInner> {
    // A panicking handler never runs under this lock, so the data is intact.
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic`.  Dropping or releasing the returned
    /// registration unsubscribes it.
    pub fn subscribe(
        &self,
        topic: &str,
        handler: impl Fn(&BusMessage) + Send + Sync + 'static,
    ) -> Registration {
        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner
                .topics
                .entry(topic.to_string())
                .or_default()
                .push((id, Arc::new(handler)));
            id
        };
        debug!("bus: subscribed #{} to {:?}", id, topic);

        let weak: Weak<Mutex<BusInner>> = Arc::downgrade(&self.inner);
        let topic = topic.to_string();
        Registration::new("bus-subscription", move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = lock(&inner);
                if let Some(handlers) = inner.topics.get_mut(&topic) {
                    handlers.retain(|(hid, _)| *hid != id);
                    if handlers.is_empty() {
                        inner.topics.remove(&topic);
                    }
                }
            }
        })
    }

    /// Deliver `message` to every subscriber of its topic.  Returns how many
    /// handlers ran.
    pub fn publish(&self, message: &BusMessage) -> usize {
        let handlers: Vec<Handler> = {
            let inner = lock(&self.inner);
            inner
                .topics
                .get(message.topic())
                .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        debug!(
            "bus: publish {:?} to {} handler(s)",
            message.topic(),
            handlers.len()
        );
        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.inner).topics.get(topic).map_or(0, |hs| hs.len())
    }
}
