//! In-process collaborators: a clock-driven audio engine, an in-memory
//! favorites set and a session store.  The `laud` binary runs on these and the
//! integration tests use them as fakes.
//!
//! The engine keeps its queue behind a std `Mutex` that is never held across
//! an await or while listeners run.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use laud_proto::playback::{EngineEventKind, PlayerState, Playlist, RepeatMode, Track};
use laud_proto::protocol::BusMessage;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bus::MessageBus;
use crate::context::PlaybackContext;
use crate::engine::{AudioEngine, EngineListener, FavoritesCollection, SessionStore};
use crate::error::{EngineError, FavoritesError, SessionError};
use crate::registration::Registration;

/// Pressing previous this far into a track restarts it instead.
const RESTART_THRESHOLD_MS: u64 = 3_000;

#[derive(Debug, Default)]
struct Player {
    queue: Vec<Track>,
    index: Option<usize>,
    position_ms: u64,
    state: PlayerState,
    repeat: RepeatMode,
}

impl Player {
    fn current(&self) -> Option<&Track> {
        self.index.and_then(|i| self.queue.get(i))
    }

    fn start(&mut self, index: usize) {
        self.index = Some(index);
        self.position_ms = 0;
    }

    /// Keep the current track first and shuffle everything else after it.
    fn shuffle_upcoming(&mut self) {
        let Some(i) = self.index else { return };
        let current = self.queue.remove(i);
        self.queue.shuffle(&mut rand::thread_rng());
        self.queue.insert(0, current);
        self.index = Some(0);
    }
}

type SharedListener = Arc<dyn Fn(EngineEventKind) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    table: HashMap<EngineEventKind, Vec<(u64, SharedListener)>>,
}

struct EngineInner {
    player: Mutex<Player>,
    listeners: Mutex<Listeners>,
    context: Arc<PlaybackContext>,
    available: AtomicBool,
}

impl EngineInner {
    fn player(&self) -> MutexGuard<'_, Player> {
        self.player.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, kind: EngineEventKind) {
        let targets: Vec<SharedListener> = self
            .listeners()
            .table
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in targets {
            listener(kind);
        }
    }

    fn check(&self) -> Result<(), EngineError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(EngineError::Unavailable("simulated engine offline".into()))
        }
    }
}

/// Audio engine that plays a queue against a virtual clock.
#[derive(Clone)]
pub struct SimulatedEngine {
    inner: Arc<EngineInner>,
}

impl SimulatedEngine {
    pub fn new(context: Arc<PlaybackContext>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                player: Mutex::new(Player::default()),
                listeners: Mutex::new(Listeners::default()),
                context,
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Replace the queue with `playlist` and make it the current playlist.
    pub fn load_playlist(&self, playlist: Playlist) {
        info!(
            "engine: loading playlist {} ({} tracks)",
            playlist.name,
            playlist.tracks.len()
        );
        self.replace_queue(playlist.tracks.clone());
        self.inner.context.set_current_playlist(Some(playlist));
        self.inner.emit(EngineEventKind::TrackChanged);
    }

    /// Replace the queue without an owning playlist.
    pub fn load_tracks(&self, tracks: Vec<Track>) {
        self.replace_queue(tracks);
        self.inner.context.set_current_playlist(None);
        self.inner.emit(EngineEventKind::TrackChanged);
    }

    fn replace_queue(&self, tracks: Vec<Track>) {
        let mut player = self.inner.player();
        player.index = if tracks.is_empty() { None } else { Some(0) };
        player.queue = tracks;
        player.position_ms = 0;
        player.state = PlayerState::Paused;
    }

    /// While unavailable every engine call fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::Release);
    }

    /// Move the clock forward by `elapsed_ms` and emit whatever callbacks the
    /// engine would: a tick, a track change or the end of the queue.
    pub fn advance(&self, elapsed_ms: u64) {
        let events: Vec<EngineEventKind> = {
            let mut player = self.inner.player();
            if player.state != PlayerState::Playing {
                return;
            }
            let (Some(index), Some(duration)) =
                (player.index, player.current().map(|t| t.duration_ms))
            else {
                return;
            };

            player.position_ms = player.position_ms.saturating_add(elapsed_ms);
            if player.position_ms < duration {
                vec![EngineEventKind::ProgressTick]
            } else {
                let len = player.queue.len();
                match player.repeat {
                    RepeatMode::Track => {
                        player.start(index);
                        vec![EngineEventKind::TrackChanged]
                    }
                    RepeatMode::Queue => {
                        player.start((index + 1) % len);
                        vec![EngineEventKind::TrackChanged]
                    }
                    RepeatMode::Off if index + 1 < len => {
                        player.start(index + 1);
                        vec![EngineEventKind::TrackChanged]
                    }
                    RepeatMode::Off => {
                        player.position_ms = duration;
                        player.state = PlayerState::Paused;
                        vec![EngineEventKind::QueueEnded, EngineEventKind::StateChanged]
                    }
                }
            }
        };

        for kind in events {
            self.inner.emit(kind);
        }
    }

    /// Drive `advance` from a tokio interval.  The task ends once every handle
    /// to the engine is gone.
    pub fn spawn_ticker(&self, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let step = interval.as_millis() as u64;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(inner) => SimulatedEngine { inner }.advance(step),
                    None => break,
                }
            }
            debug!("engine: ticker stopped");
        })
    }

    /// Fire a callback without touching the player.
    pub fn emit(&self, kind: EngineEventKind) {
        self.inner.emit(kind);
    }

    pub fn listener_count(&self, kind: EngineEventKind) -> usize {
        self.inner.listeners().table.get(&kind).map_or(0, Vec::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.inner.listeners().table.values().map(Vec::len).sum()
    }

    pub fn queue(&self) -> Vec<Track> {
        self.inner.player().queue.clone()
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    async fn playback_state(&self) -> Result<PlayerState, EngineError> {
        self.inner.check()?;
        Ok(self.inner.player().state)
    }

    async fn play(&self) -> Result<(), EngineError> {
        self.inner.check()?;
        {
            let mut player = self.inner.player();
            if player.current().is_none() {
                return Err(EngineError::Rejected("nothing loaded".into()));
            }
            player.state = PlayerState::Playing;
        }
        self.inner.emit(EngineEventKind::StateChanged);
        Ok(())
    }

    async fn pause(&self) -> Result<(), EngineError> {
        self.inner.check()?;
        self.inner.player().state = PlayerState::Paused;
        self.inner.emit(EngineEventKind::StateChanged);
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> Result<(), EngineError> {
        self.inner.check()?;
        let mut player = self.inner.player();
        let duration = player
            .current()
            .map(|t| t.duration_ms)
            .ok_or_else(|| EngineError::Rejected("nothing loaded".into()))?;
        player.position_ms = position_ms.min(duration);
        Ok(())
    }

    async fn skip_next(&self) -> Result<(), EngineError> {
        self.inner.check()?;
        let changed = {
            let mut player = self.inner.player();
            let len = player.queue.len();
            match player.index {
                Some(i) if i + 1 < len => {
                    player.start(i + 1);
                    true
                }
                Some(_) if player.repeat == RepeatMode::Queue => {
                    player.start(0);
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.inner.emit(EngineEventKind::TrackChanged);
        }
        Ok(())
    }

    async fn skip_previous(&self) -> Result<(), EngineError> {
        self.inner.check()?;
        let changed = {
            let mut player = self.inner.player();
            match player.index {
                Some(i) if i > 0 && player.position_ms < RESTART_THRESHOLD_MS => {
                    player.start(i - 1);
                    true
                }
                Some(_) => {
                    player.position_ms = 0;
                    false
                }
                None => false,
            }
        };
        if changed {
            self.inner.emit(EngineEventKind::TrackChanged);
        }
        Ok(())
    }

    async fn position_ms(&self) -> Result<u64, EngineError> {
        self.inner.check()?;
        Ok(self.inner.player().position_ms)
    }

    async fn current_track(&self) -> Result<Option<Track>, EngineError> {
        self.inner.check()?;
        Ok(self.inner.player().current().cloned())
    }

    async fn repeat_mode(&self) -> Result<RepeatMode, EngineError> {
        self.inner.check()?;
        Ok(self.inner.player().repeat)
    }

    async fn advance_repeat_mode(&self) -> Result<(), EngineError> {
        self.inner.check()?;
        let mut player = self.inner.player();
        player.repeat = player.repeat.next();
        Ok(())
    }

    async fn shuffle_queue(&self) -> Result<(), EngineError> {
        self.inner.check()?;
        self.inner.player().shuffle_upcoming();
        Ok(())
    }

    fn add_event_listener(&self, kind: EngineEventKind, listener: EngineListener) -> Registration {
        let id = {
            let mut listeners = self.inner.listeners();
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners
                .table
                .entry(kind)
                .or_default()
                .push((id, Arc::from(listener)));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Registration::new("engine-listener", move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(entries) = inner.listeners().table.get_mut(&kind) {
                    entries.retain(|(entry, _)| *entry != id);
                }
            }
        })
    }
}

// ── Favorites ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryFavorites {
    ids: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    /// While unavailable every write fails and membership stays unchanged.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Release);
    }
}

#[async_trait]
impl FavoritesCollection for MemoryFavorites {
    fn contains(&self, track_id: &str) -> bool {
        self.ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(track_id)
    }

    async fn set(&self, track_id: &str, favorite: bool) -> Result<(), FavoritesError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(FavoritesError::Unavailable("favorites store offline".into()));
        }
        let mut ids = self.ids.write().unwrap_or_else(|e| e.into_inner());
        if favorite {
            ids.insert(track_id.to_string());
        } else {
            ids.remove(track_id);
        }
        Ok(())
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Session store that keeps the signed-in user in memory and announces a
/// completed login on the bus.
pub struct MemorySessionStore {
    bus: MessageBus,
    user: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new(bus: MessageBus, stored_user: Option<String>) -> Self {
        Self {
            bus,
            user: RwLock::new(stored_user),
        }
    }

    /// Finish an interactive login and publish `login`.
    pub fn sign_in(&self, user: impl Into<String>) {
        let user = user.into();
        info!("session: signed in as {}", user);
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
        self.bus.publish(&BusMessage::Login);
    }

    pub fn user(&self) -> Option<String> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn is_logged_in(&self) -> bool {
        self.user().is_some()
    }

    async fn login(&self) -> Result<(), SessionError> {
        if self.user().is_none() {
            return Err(SessionError::NotSignedIn);
        }
        self.bus.publish(&BusMessage::Login);
        Ok(())
    }
}
