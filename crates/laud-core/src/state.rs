use std::sync::Arc;

use laud_proto::nav::NavState;
use laud_proto::playback::PlaybackSnapshot;
use serde::Serialize;
use tokio::sync::RwLock;

/// Everything a renderer needs.  `rev` increases on every change so readers
/// can tell whether they missed an update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShellState {
    pub rev: u64,
    pub nav: NavState,
    pub playback: PlaybackSnapshot,
}

/// Shared read side of the shell.  Only the core loop writes.
#[derive(Clone)]
pub struct StateStore {
    state: Arc<RwLock<ShellState>>,
}

impl StateStore {
    pub fn new(nav: NavState) -> Self {
        Self {
            state: Arc::new(RwLock::new(ShellState {
                rev: 1,
                nav,
                playback: PlaybackSnapshot::default(),
            })),
        }
    }

    pub async fn get_state(&self) -> ShellState {
        self.state.read().await.clone()
    }

    /// Returns `true` if the stored value changed.
    pub async fn set_nav(&self, nav: NavState) -> bool {
        let mut state = self.state.write().await;
        if state.nav == nav {
            return false;
        }
        state.nav = nav;
        state.rev += 1;
        true
    }

    /// Returns `true` if the stored value changed.
    pub async fn set_playback(&self, playback: &PlaybackSnapshot) -> bool {
        let mut state = self.state.write().await;
        if state.playback == *playback {
            return false;
        }
        state.playback = playback.clone();
        state.rev += 1;
        true
    }
}
