//! Pending-command tracking for toggle and skip.
//!
//! Tapping play/pause or skip repeatedly while the first request is still
//! queued or awaiting the engine would otherwise replay every tap against
//! whatever state the engine reaches in between.  While a command of the same
//! kind is in flight, further submissions are dropped.
//!
//! # States (per kind)
//! ```text
//!  Idle      nothing queued; a submission is accepted and moves to InFlight
//!  InFlight  accepted, not yet finished by the core loop; submissions dropped
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use laud_proto::playback::PlaybackCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Toggle,
    Skip,
}

impl PendingKind {
    /// Commands outside these kinds are never dropped.
    pub fn of(command: &PlaybackCommand) -> Option<Self> {
        match command {
            PlaybackCommand::TogglePlayback => Some(PendingKind::Toggle),
            PlaybackCommand::Skip { .. } => Some(PendingKind::Skip),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PendingCommands {
    enabled: bool,
    toggle: AtomicBool,
    skip: AtomicBool,
}

impl PendingCommands {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            toggle: AtomicBool::new(false),
            skip: AtomicBool::new(false),
        }
    }

    fn flag(&self, kind: PendingKind) -> &AtomicBool {
        match kind {
            PendingKind::Toggle => &self.toggle,
            PendingKind::Skip => &self.skip,
        }
    }

    /// Claim the slot for `command`.  `false` means drop the submission.
    pub fn try_begin(&self, command: &PlaybackCommand) -> bool {
        if !self.enabled {
            return true;
        }
        match PendingKind::of(command) {
            Some(kind) => self
                .flag(kind)
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            None => true,
        }
    }

    /// Release the slot once the core loop has handled `command`, or when the
    /// submission never reached the queue.
    pub fn finish(&self, command: &PlaybackCommand) {
        if let Some(kind) = PendingKind::of(command) {
            self.flag(kind).store(false, Ordering::Release);
        }
    }

    pub fn is_pending(&self, kind: PendingKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }
}
