/// ShellCore: single-owner event loop for navigation and playback state.
///
/// UI taps, the page-navigation signal, the hardware cancel button, the
/// `login` bus topic and the four engine callbacks all post `ShellEvent`s into
/// one bounded queue.  ShellCore owns `NavState` and the latest
/// `PlaybackSnapshot` exclusively and handles events one at a time, so no two
/// mutations race.
///
/// The loop itself never awaits the engine or the favorites store.  Playback
/// commands go to a worker task that runs them one at a time in submission
/// order; engine callbacks start a background re-read.  Both post their
/// readings back as events, and only a reading newer than the held snapshot
/// replaces it.  A stalled engine call therefore holds up later playback
/// commands but never navigation or the cancel button.
///
/// After each event that changes state, ShellCore writes the new values into
/// the `StateStore` and broadcasts `ShellBroadcast::StateUpdated`.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use laud_proto::config::Config;
use laud_proto::nav::{NavState, PageCommand, TAB_COUNT};
use laud_proto::playback::{EngineEventKind, PlaybackCommand};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::back::{self, CancelOutcome};
use crate::bus::MessageBus;
use crate::context::PlaybackContext;
use crate::engine::{AudioEngine, FavoritesCollection, SessionStore};
use crate::error::{CoreError, MirrorError};
use crate::mirror::{LatestSnapshot, PlaybackMirror, Reading};
use crate::pending::PendingCommands;
use crate::registration::Registration;
use crate::router;
use crate::session::SessionGate;
use crate::signals::{CancelSource, NavigationSignal};
use crate::state::{ShellState, StateStore};

// ── ShellEvent ────────────────────────────────────────────────────────────────

/// All inputs into the ShellCore loop.
#[derive(Debug)]
pub enum ShellEvent {
    /// A page request from a UI tap or the navigation signal.
    Page(PageCommand),
    /// Tab bar selection.
    SelectTab(usize),
    /// Hardware cancel button.
    Cancel,
    /// `login` was published on the bus.
    LoggedIn,
    /// Raw engine callback.
    Engine(EngineEventKind),
    /// User playback command.
    Playback(PlaybackCommand),
    /// The command worker finished `command`.
    PlaybackDone {
        command: PlaybackCommand,
        outcome: Result<Reading, MirrorError>,
    },
    /// A background re-read finished.
    Refreshed(Result<Reading, MirrorError>),
    /// Reply with the state once every earlier event has been handled.  Does
    /// not wait for playback work still in flight.
    Snapshot(oneshot::Sender<ShellState>),
    /// Like `Snapshot`, but the reply also waits until no playback command or
    /// re-read is in flight.
    Settled(oneshot::Sender<ShellState>),
    /// Release all listeners and stop the loop.
    Shutdown,
}

/// What ShellCore tells its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellBroadcast {
    /// `StateStore` holds a new revision.
    StateUpdated,
    /// Cancel pressed with nothing left to close.
    ExitRequested,
}

/// External services the core talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn AudioEngine>,
    pub favorites: Arc<dyn FavoritesCollection>,
    pub session: Arc<dyn SessionStore>,
    pub context: Arc<PlaybackContext>,
    pub bus: MessageBus,
}

// ── ShellHandle ───────────────────────────────────────────────────────────────

/// Cloneable sender side used by UI code and by the listeners the core
/// registers on its collaborators.
#[derive(Clone)]
pub struct ShellHandle {
    event_tx: mpsc::Sender<ShellEvent>,
    pending: Arc<PendingCommands>,
    /// Set when an engine callback other than a tick found the queue full.
    engine_stale: Arc<AtomicBool>,
}

impl ShellHandle {
    pub async fn navigate(&self, command: PageCommand) -> Result<(), CoreError> {
        self.send(ShellEvent::Page(command)).await
    }

    /// Navigate by page name.  Unknown names are dropped without touching state.
    pub fn navigate_named(&self, page: &str) -> bool {
        match page.parse::<PageCommand>() {
            Ok(command) => self.post(ShellEvent::Page(command)),
            Err(e) => {
                warn!("ignoring navigation request: {}", e);
                false
            }
        }
    }

    pub async fn select_tab(&self, index: usize) -> Result<(), CoreError> {
        self.send(ShellEvent::SelectTab(index)).await
    }

    pub async fn cancel(&self) -> Result<(), CoreError> {
        self.send(ShellEvent::Cancel).await
    }

    /// Submit a playback command.  Returns `Ok(false)` when it was dropped
    /// because the same kind of command is still in flight.
    pub async fn playback(&self, command: PlaybackCommand) -> Result<bool, CoreError> {
        if !self.pending.try_begin(&command) {
            debug!("dropping {:?}: previous one still pending", command);
            return Ok(false);
        }
        if let Err(e) = self.send(ShellEvent::Playback(command)).await {
            self.pending.finish(&command);
            return Err(e);
        }
        Ok(true)
    }

    /// State after everything queued before this call has been handled.
    /// Playback commands still waiting on the engine are not waited for.
    pub async fn snapshot(&self) -> Result<ShellState, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(ShellEvent::Snapshot(tx)).await?;
        rx.await.map_err(|_| CoreError::Closed)
    }

    /// State once everything queued before this call has been handled and
    /// every playback command and re-read it started has landed.
    pub async fn settled(&self) -> Result<ShellState, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(ShellEvent::Settled(tx)).await?;
        rx.await.map_err(|_| CoreError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.send(ShellEvent::Shutdown).await
    }

    /// Non-blocking post for synchronous callbacks.  Returns `false` if the
    /// event was not queued.  On a full queue progress ticks are dropped and
    /// any other engine callback is folded into one re-read once the loop
    /// catches up.
    pub fn post(&self, event: ShellEvent) -> bool {
        match self.event_tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                match event {
                    ShellEvent::Engine(EngineEventKind::ProgressTick) => {
                        debug!("event queue full, dropping progress tick");
                    }
                    ShellEvent::Engine(kind) => {
                        warn!("event queue full, deferring {:?} to next refresh", kind);
                        self.engine_stale.store(true, Ordering::Release);
                    }
                    event => warn!("event queue full, dropping {:?}", event),
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    async fn send(&self, event: ShellEvent) -> Result<(), CoreError> {
        self.event_tx.send(event).await.map_err(|_| CoreError::Closed)
    }

    /// Hand a finished background job back to the loop.  Lost if the loop
    /// already stopped.
    async fn deliver(&self, event: ShellEvent) {
        if self.send(event).await.is_err() {
            debug!("core stopped before a playback result arrived");
        }
    }
}

// ── ShellCore ─────────────────────────────────────────────────────────────────

/// At most one background re-read runs at a time.  Requests that arrive while
/// it runs collapse into a single follow-up.
#[derive(Debug, Default)]
struct RefreshState {
    running: bool,
    again: bool,
}

pub struct ShellCore {
    nav: NavState,
    mirror: PlaybackMirror,
    latest: LatestSnapshot,
    session: SessionGate,
    engine: Arc<dyn AudioEngine>,
    bus: MessageBus,
    store: StateStore,
    broadcast_tx: broadcast::Sender<ShellBroadcast>,
    handle: ShellHandle,
    pending: Arc<PendingCommands>,
    commands_tx: mpsc::Sender<PlaybackCommand>,
    commands_rx: Option<mpsc::Receiver<PlaybackCommand>>,
    commands_in_flight: usize,
    refresh: RefreshState,
    refresh_task: Option<JoinHandle<()>>,
    /// `Settled` replies held until playback work drains.
    waiters: Vec<oneshot::Sender<ShellState>>,
    /// Page, cancel and engine listeners, held until deactivation.
    registrations: Vec<Registration>,
}

impl ShellCore {
    /// The bounded queue feeding `run`.
    pub fn channel(config: &Config) -> (mpsc::Sender<ShellEvent>, mpsc::Receiver<ShellEvent>) {
        mpsc::channel(config.core.queue_capacity.max(1))
    }

    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        broadcast_tx: broadcast::Sender<ShellBroadcast>,
        event_tx: mpsc::Sender<ShellEvent>,
    ) -> Self {
        let Collaborators {
            engine,
            favorites,
            session,
            context,
            bus,
        } = collaborators;

        let session = SessionGate::new(session);
        let nav = session.initial_state();
        let mirror = PlaybackMirror::new(Arc::clone(&engine), favorites, context, bus.clone());
        let pending = Arc::new(PendingCommands::new(config.playback.ignore_while_pending));
        let handle = ShellHandle {
            event_tx,
            pending: Arc::clone(&pending),
            engine_stale: Arc::new(AtomicBool::new(false)),
        };
        let (commands_tx, commands_rx) = mpsc::channel(config.core.queue_capacity.max(1));

        Self {
            nav,
            mirror,
            latest: LatestSnapshot::default(),
            session,
            engine,
            bus,
            store: StateStore::new(nav),
            broadcast_tx,
            handle,
            pending,
            commands_tx,
            commands_rx: Some(commands_rx),
            commands_in_flight: 0,
            refresh: RefreshState::default(),
            refresh_task: None,
            waiters: Vec::new(),
            registrations: Vec::new(),
        }
    }

    pub fn handle(&self) -> ShellHandle {
        self.handle.clone()
    }

    pub fn store(&self) -> StateStore {
        self.store.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.registrations.is_empty()
    }

    /// Acquire every listener the core needs.  Must run inside a tokio
    /// runtime.  A second call is ignored so no source ever sees two listeners
    /// from the same core.
    pub fn activate(&mut self, navigation: &NavigationSignal, cancel: &CancelSource) {
        if self.is_active() {
            warn!("ShellCore: already active");
            return;
        }

        let h = self.handle.clone();
        self.registrations
            .push(navigation.register_listener(move |page| {
                h.navigate_named(page);
            }));

        // Always consumed: closing an overlay or asking the host to exit.
        let h = self.handle.clone();
        self.registrations.push(cancel.register_listener(move || {
            h.post(ShellEvent::Cancel);
            true
        }));

        for kind in EngineEventKind::ALL {
            let h = self.handle.clone();
            let registration = self.engine.add_event_listener(
                kind,
                Box::new(move |kind| {
                    h.post(ShellEvent::Engine(kind));
                }),
            );
            self.registrations.push(registration);
        }

        let h = self.handle.clone();
        self.session.activate(&self.bus, move || {
            h.post(ShellEvent::LoggedIn);
        });

        info!(
            "ShellCore: activated with {} listeners",
            self.registrations.len()
        );
    }

    /// Release every listener exactly once.  Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        let released = self
            .registrations
            .drain(..)
            .map(|mut r| r.release())
            .filter(|released| *released)
            .count();
        self.session.deactivate();
        if released > 0 {
            info!("ShellCore: released {} listeners", released);
        }
    }

    /// Run the event loop until a `Shutdown` event arrives or every sender is
    /// gone.  Listeners are released and background playback work is stopped
    /// on the way out.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<ShellEvent>) -> anyhow::Result<()> {
        info!("ShellCore: starting event loop");

        let worker = self.commands_rx.take().map(|commands| {
            tokio::spawn(run_commands(
                self.mirror.clone(),
                commands,
                self.handle.clone(),
            ))
        });
        self.request_refresh();

        loop {
            match event_rx.recv().await {
                None => {
                    info!("ShellCore: event channel closed, shutting down");
                    break;
                }
                Some(ShellEvent::Shutdown) => {
                    info!("ShellCore: shutdown requested");
                    break;
                }
                Some(evt) => {
                    self.handle_event(evt).await;
                    self.after_event().await;
                }
            }
        }

        if let Some(worker) = worker {
            worker.abort();
        }
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        self.deactivate();
        Ok(())
    }

    async fn handle_event(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::Page(command) => {
                info!("ShellCore: page {}", command);
                self.set_nav(router::apply(self.nav, command)).await;
                if command == PageCommand::Playing {
                    // The overlay renders against current engine truth.
                    self.request_refresh();
                }
            }

            ShellEvent::SelectTab(index) => {
                if index >= TAB_COUNT {
                    warn!("ShellCore: ignoring tab index {}", index);
                    return;
                }
                self.set_nav(router::select_tab(self.nav, index)).await;
            }

            ShellEvent::Cancel => match back::on_cancel_signal(&self.nav) {
                CancelOutcome::Closed { closed, state } => {
                    info!("ShellCore: cancel closed {} overlay", closed.label());
                    self.set_nav(state).await;
                }
                CancelOutcome::ExitRequested => {
                    info!("ShellCore: cancel with no overlay, requesting exit");
                    let _ = self.broadcast_tx.send(ShellBroadcast::ExitRequested);
                }
            },

            ShellEvent::LoggedIn => {
                info!("ShellCore: login event");
                let next = self.session.on_login(self.nav);
                self.set_nav(next).await;
            }

            ShellEvent::Engine(kind) => {
                debug!("ShellCore: engine {:?}", kind);
                self.request_refresh();
            }

            ShellEvent::Playback(command) => {
                debug!("ShellCore: playback {:?}", command);
                match self.commands_tx.try_send(command) {
                    Ok(()) => self.commands_in_flight += 1,
                    Err(e) => {
                        warn!("ShellCore: dropping {:?}: {}", command, e);
                        self.pending.finish(&command);
                    }
                }
            }

            ShellEvent::PlaybackDone { command, outcome } => {
                self.commands_in_flight = self.commands_in_flight.saturating_sub(1);
                self.pending.finish(&command);
                match outcome {
                    Ok(reading) => self.accept(reading).await,
                    Err(e) => warn!("ShellCore: {:?} failed: {}", command, e),
                }
            }

            ShellEvent::Refreshed(outcome) => {
                self.refresh.running = false;
                self.refresh_task = None;
                match outcome {
                    Ok(reading) => self.accept(reading).await,
                    Err(e) => warn!("ShellCore: playback refresh failed: {}", e),
                }
                if std::mem::take(&mut self.refresh.again) {
                    self.request_refresh();
                }
            }

            ShellEvent::Snapshot(reply) => {
                let _ = reply.send(self.store.get_state().await);
            }

            ShellEvent::Settled(reply) => self.waiters.push(reply),

            ShellEvent::Shutdown => {}
        }
    }

    /// Pick up engine callbacks that found the queue full, then answer any
    /// `Settled` waiters once playback work has drained.
    async fn after_event(&mut self) {
        if self.handle.engine_stale.swap(false, Ordering::AcqRel) {
            debug!("ShellCore: refreshing for deferred engine events");
            self.request_refresh();
        }

        let idle = self.commands_in_flight == 0 && !self.refresh.running && !self.refresh.again;
        if idle && !self.waiters.is_empty() {
            let state = self.store.get_state().await;
            for reply in self.waiters.drain(..) {
                let _ = reply.send(state.clone());
            }
        }
    }

    fn request_refresh(&mut self) {
        if self.refresh.running {
            self.refresh.again = true;
            return;
        }
        self.refresh.running = true;

        let mirror = self.mirror.clone();
        let handle = self.handle.clone();
        self.refresh_task = Some(tokio::spawn(async move {
            let outcome = mirror.read().await;
            handle.deliver(ShellEvent::Refreshed(outcome)).await;
        }));
    }

    async fn accept(&mut self, reading: Reading) {
        if self.latest.accept(reading) && self.store.set_playback(self.latest.get()).await {
            let _ = self.broadcast_tx.send(ShellBroadcast::StateUpdated);
        }
    }

    async fn set_nav(&mut self, next: NavState) {
        if next == self.nav {
            return;
        }
        debug!("ShellCore: nav {:?} → {:?}", self.nav, next);
        self.nav = next;
        if self.store.set_nav(next).await {
            let _ = self.broadcast_tx.send(ShellBroadcast::StateUpdated);
        }
    }
}

/// Runs playback commands one at a time in submission order and posts each
/// outcome back to the loop.
async fn run_commands(
    mirror: PlaybackMirror,
    mut commands: mpsc::Receiver<PlaybackCommand>,
    handle: ShellHandle,
) {
    while let Some(command) = commands.recv().await {
        let outcome = mirror.apply(command).await;
        handle
            .deliver(ShellEvent::PlaybackDone { command, outcome })
            .await;
    }
    debug!("ShellCore: command worker stopped");
}
