//! Host-side signal sources: the global page-navigation signal and the
//! hardware cancel ("back") button.  Each holds a single listener slot;
//! registering again replaces the previous listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::registration::Registration;

struct Slot<L: ?Sized> {
    next_id: AtomicU64,
    listener: Mutex<Option<(u64, Arc<L>)>>,
}

impl<L: ?Sized> Slot<L> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listener: Mutex::new(None),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<(u64, Arc<L>)>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> Option<Arc<L>> {
        self.guard().as_ref().map(|(_, l)| Arc::clone(l))
    }
}

impl<L: ?Sized + Send + Sync + 'static> Slot<L> {
    fn install(self: &Arc<Self>, label: &'static str, listener: Arc<L>) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if self.guard().replace((id, listener)).is_some() {
            debug!("{}: previous listener replaced", label);
        }

        let slot = Arc::downgrade(self);
        Registration::new(label, move || {
            if let Some(slot) = slot.upgrade() {
                let mut guard = slot.guard();
                // Only clear the slot if a later registration hasn't replaced us.
                if guard.as_ref().is_some_and(|(current, _)| *current == id) {
                    *guard = None;
                }
            }
        })
    }
}

type PageListener = dyn Fn(&str) + Send + Sync;

/// Global "navigate to page" signal.  Pages arrive as raw names; the listener
/// decides what it understands.
#[derive(Clone)]
pub struct NavigationSignal {
    slot: Arc<Slot<PageListener>>,
}

impl NavigationSignal {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot::new()),
        }
    }

    pub fn register_listener(&self, listener: impl Fn(&str) + Send + Sync + 'static) -> Registration {
        self.slot.install("page-listener", Arc::new(listener))
    }

    /// Returns `false` when nobody is listening.
    pub fn navigate(&self, page: &str) -> bool {
        match self.slot.current() {
            Some(listener) => {
                listener(page);
                true
            }
            None => false,
        }
    }

    pub fn has_listener(&self) -> bool {
        self.slot.current().is_some()
    }
}

impl Default for NavigationSignal {
    fn default() -> Self {
        Self::new()
    }
}

type CancelListener = dyn Fn() -> bool + Send + Sync;

/// Hardware cancel button.  The listener reports whether it consumed the press.
#[derive(Clone)]
pub struct CancelSource {
    slot: Arc<Slot<CancelListener>>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot::new()),
        }
    }

    pub fn register_listener(
        &self,
        listener: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Registration {
        self.slot.install("cancel-listener", Arc::new(listener))
    }

    /// Fire the signal.  `false` means unhandled; the host applies its own
    /// default behaviour.
    pub fn press(&self) -> bool {
        self.slot.current().is_some_and(|listener| listener())
    }

    pub fn has_listener(&self) -> bool {
        self.slot.current().is_some()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}
