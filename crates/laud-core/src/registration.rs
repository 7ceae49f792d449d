//! Registration: a listener slot held for the lifetime of a component.
//!
//! Acquired once at activation, released exactly once: either explicitly via
//! `release()` or when the guard is dropped (which also covers unwinding).
//! Releasing an already-released registration is a no-op.

use std::fmt;

use tracing::debug;

type Release = Box<dyn FnOnce() + Send>;

pub struct Registration {
    label: &'static str,
    release: Option<Release>,
}

impl Registration {
    pub fn new(label: &'static str, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label,
            release: Some(Box::new(release)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Returns `true` if this call performed the release.
    pub fn release(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                release();
                debug!("registration released: {}", self.label);
                true
            }
            None => false,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}
