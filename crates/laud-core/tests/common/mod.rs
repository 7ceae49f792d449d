//! Shared harness: a running ShellCore wired to the simulated collaborators.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use laud_core::bus::MessageBus;
use laud_core::context::PlaybackContext;
use laud_core::engine::{AudioEngine, EngineListener, FavoritesCollection};
use laud_core::registration::Registration;
use laud_core::signals::{CancelSource, NavigationSignal};
use laud_core::sim::{MemoryFavorites, MemorySessionStore, SimulatedEngine};
use laud_core::state::{ShellState, StateStore};
use laud_core::{
    Collaborators, EngineError, FavoritesError, ShellBroadcast, ShellCore, ShellHandle,
};
use laud_proto::config::Config;
use laud_proto::playback::{EngineEventKind, PlayerState, Playlist, RepeatMode, Track};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

pub fn track(id: &str, duration_ms: u64) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        duration_ms,
        artwork: None,
        url: None,
    }
}

pub fn playlist() -> Playlist {
    Playlist {
        id: "pl-1".to_string(),
        name: "Morning".to_string(),
        tracks: vec![
            track("a", 180_000),
            track("b", 200_000),
            track("c", 240_000),
        ],
    }
}

/// Simulated engine whose `seek_to` can be held open until the test lets it go.
pub struct GatedEngine {
    pub sim: SimulatedEngine,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedEngine {
    pub fn new(sim: SimulatedEngine) -> Self {
        Self {
            sim,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// The next `seek_to` blocks until `release_seek`.
    pub fn arm_seek(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub async fn seek_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release_seek(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl AudioEngine for GatedEngine {
    async fn playback_state(&self) -> Result<PlayerState, EngineError> {
        self.sim.playback_state().await
    }
    async fn play(&self) -> Result<(), EngineError> {
        self.sim.play().await
    }
    async fn pause(&self) -> Result<(), EngineError> {
        self.sim.pause().await
    }
    async fn seek_to(&self, position_ms: u64) -> Result<(), EngineError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.sim.seek_to(position_ms).await
    }
    async fn skip_next(&self) -> Result<(), EngineError> {
        self.sim.skip_next().await
    }
    async fn skip_previous(&self) -> Result<(), EngineError> {
        self.sim.skip_previous().await
    }
    async fn position_ms(&self) -> Result<u64, EngineError> {
        self.sim.position_ms().await
    }
    async fn current_track(&self) -> Result<Option<Track>, EngineError> {
        self.sim.current_track().await
    }
    async fn repeat_mode(&self) -> Result<RepeatMode, EngineError> {
        self.sim.repeat_mode().await
    }
    async fn advance_repeat_mode(&self) -> Result<(), EngineError> {
        self.sim.advance_repeat_mode().await
    }
    async fn shuffle_queue(&self) -> Result<(), EngineError> {
        self.sim.shuffle_queue().await
    }
    fn add_event_listener(&self, kind: EngineEventKind, listener: EngineListener) -> Registration {
        self.sim.add_event_listener(kind, listener)
    }
}

/// In-memory favorites that count every write reaching the store.
#[derive(Default)]
pub struct CountingFavorites {
    pub store: MemoryFavorites,
    writes: AtomicUsize,
}

impl CountingFavorites {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, available: bool) {
        self.store.set_available(available);
    }
}

#[async_trait]
impl FavoritesCollection for CountingFavorites {
    fn contains(&self, track_id: &str) -> bool {
        self.store.contains(track_id)
    }
    async fn set(&self, track_id: &str, favorite: bool) -> Result<(), FavoritesError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.store.set(track_id, favorite).await
    }
}

pub struct Harness {
    pub engine: Arc<GatedEngine>,
    pub favorites: Arc<CountingFavorites>,
    pub session: Arc<MemorySessionStore>,
    pub context: Arc<PlaybackContext>,
    pub bus: MessageBus,
    pub navigation: NavigationSignal,
    pub cancel: CancelSource,
    pub handle: ShellHandle,
    pub store: StateStore,
    pub events: broadcast::Receiver<ShellBroadcast>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    pub async fn start(user: Option<&str>) -> Self {
        Self::start_with(Config::default(), user).await
    }

    pub async fn start_with(config: Config, user: Option<&str>) -> Self {
        let bus = MessageBus::new();
        let context = Arc::new(PlaybackContext::new());
        let engine = Arc::new(GatedEngine::new(SimulatedEngine::new(context.clone())));
        let favorites = Arc::new(CountingFavorites::default());
        let session = Arc::new(MemorySessionStore::new(
            bus.clone(),
            user.map(str::to_string),
        ));

        let collaborators = Collaborators {
            engine: engine.clone(),
            favorites: favorites.clone(),
            session: session.clone(),
            context: context.clone(),
            bus: bus.clone(),
        };

        let (broadcast_tx, events) = broadcast::channel(config.core.broadcast_capacity);
        let (event_tx, event_rx) = ShellCore::channel(&config);
        let mut core = ShellCore::new(&config, collaborators, broadcast_tx, event_tx);

        let navigation = NavigationSignal::new();
        let cancel = CancelSource::new();
        core.activate(&navigation, &cancel);

        let handle = core.handle();
        let store = core.store();
        let task = tokio::spawn(core.run(event_rx));

        let harness = Self {
            engine,
            favorites,
            session,
            context,
            bus,
            navigation,
            cancel,
            handle,
            store,
            events,
            task,
        };
        harness.settle().await;
        harness
    }

    /// Load the three-track test playlist and wait for the mirror to see it.
    pub async fn with_playlist(self) -> Self {
        self.engine.sim.load_playlist(playlist());
        self.settle().await;
        self
    }

    /// State after every queued event has been handled and all playback work
    /// it started has landed.
    pub async fn settle(&self) -> ShellState {
        self.handle.settled().await.expect("core loop running")
    }

    /// Wait for the next `ExitRequested`, skipping state updates.
    pub async fn exit_requested(&mut self) -> bool {
        let wait = async {
            loop {
                match self.events.recv().await {
                    Ok(ShellBroadcast::ExitRequested) => return true,
                    Ok(ShellBroadcast::StateUpdated) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return false,
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .unwrap_or(false)
    }

    /// Shut the core down and wait for the loop to return.
    pub async fn stop(&mut self) {
        self.handle.shutdown().await.expect("shutdown sent");
        (&mut self.task)
            .await
            .expect("core task")
            .expect("core run");
    }
}
