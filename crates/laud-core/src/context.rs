//! PlaybackContext: shared flags owned by collaborators and read by the mirror.
//!
//! Writers: the engine side sets the current playlist and forced pause, the
//! network layer sets offline, the listen-along client sets `listening_along`.
//! The mirror only reads, and only during a refresh or a command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use laud_proto::playback::Playlist;

#[derive(Debug, Default)]
pub struct PlaybackContext {
    current_playlist: RwLock<Option<Playlist>>,
    forced_pause: AtomicBool,
    offline: AtomicBool,
    listening_along: AtomicBool,
}

impl PlaybackContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_playlist(&self) -> Option<Playlist> {
        self.current_playlist
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_current_playlist(&self, playlist: Option<Playlist>) {
        *self
            .current_playlist
            .write()
            .unwrap_or_else(|e| e.into_inner()) = playlist;
    }

    pub fn forced_pause(&self) -> bool {
        self.forced_pause.load(Ordering::Relaxed)
    }

    pub fn set_forced_pause(&self, value: bool) {
        self.forced_pause.store(value, Ordering::Relaxed);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }

    pub fn set_offline(&self, value: bool) {
        self.offline.store(value, Ordering::Relaxed);
    }

    pub fn is_listening_along(&self) -> bool {
        self.listening_along.load(Ordering::Relaxed)
    }

    pub fn set_listening_along(&self, value: bool) {
        self.listening_along.store(value, Ordering::Relaxed);
    }
}
