mod input;
mod status;

use std::sync::Arc;
use std::time::Duration;

use laud_core::bus::MessageBus;
use laud_core::context::PlaybackContext;
use laud_core::signals::{CancelSource, NavigationSignal};
use laud_core::sim::{MemoryFavorites, MemorySessionStore, SimulatedEngine};
use laud_core::state::StateStore;
use laud_core::{Collaborators, ShellBroadcast, ShellCore, ShellHandle};
use laud_proto::config::Config;
use laud_proto::playback::{EngineEventKind, Playlist, Track};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::input::ShellCommand;

/// Everything stdin commands can reach.
struct Shell {
    handle: ShellHandle,
    store: StateStore,
    navigation: NavigationSignal,
    cancel: CancelSource,
    session: Arc<MemorySessionStore>,
    context: Arc<PlaybackContext>,
    engine: SimulatedEngine,
}

impl Shell {
    /// Returns `false` when the shell should exit.
    async fn dispatch(&self, command: ShellCommand) -> anyhow::Result<bool> {
        match command {
            ShellCommand::Go(page) => {
                self.navigation.navigate(&page);
            }
            ShellCommand::Tab(index) => self.handle.select_tab(index).await?,
            ShellCommand::Back => {
                if !self.cancel.press() {
                    return Ok(false);
                }
            }
            ShellCommand::Playback(cmd) => {
                if !self.handle.playback(cmd).await? {
                    println!("busy: {:?} still pending", cmd);
                }
            }
            ShellCommand::Login(user) => self.session.sign_in(user),
            ShellCommand::Offline(on) => self.context.set_offline(on),
            ShellCommand::ListenAlong(on) => self.context.set_listening_along(on),
            ShellCommand::ForcedPause(on) => {
                self.context.set_forced_pause(on);
                // Forced pause lives outside the engine; make the mirror look.
                self.engine.emit(EngineEventKind::StateChanged);
            }
            ShellCommand::Status => println!("{}", status::line(&self.store.get_state().await)),
            ShellCommand::Help => println!("{}", input::HELP),
            ShellCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn demo_playlist() -> Playlist {
    let track = |id: &str, title: &str, artist: &str, duration_ms: u64| Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        duration_ms,
        artwork: None,
        url: None,
    };
    Playlist {
        id: "demo".to_string(),
        name: "Demo".to_string(),
        tracks: vec![
            track("demo-1", "Says", "Nils Frahm", 499_000),
            track("demo-2", "Avril 14th", "Aphex Twin", 125_000),
            track("demo-3", "Open Eye Signal", "Jon Hopkins", 468_000),
            track("demo-4", "Svefn-g-englar", "Sigur Rós", 604_000),
        ],
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = laud_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_default();
    let log_path = config.log_path();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.filter.clone());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("laud log: {}", log_path.display());
    tracing::info!("laud starting…");

    // ── Collaborators ────────────────────────────────────────────────────────
    let bus = MessageBus::new();
    let context = Arc::new(PlaybackContext::new());
    let engine = SimulatedEngine::new(context.clone());
    let favorites = Arc::new(MemoryFavorites::new());
    let session = Arc::new(MemorySessionStore::new(
        bus.clone(),
        std::env::var("LAUD_USER").ok(),
    ));

    // ── Channels ─────────────────────────────────────────────────────────────
    let (broadcast_tx, mut broadcast_rx) =
        broadcast::channel::<ShellBroadcast>(config.core.broadcast_capacity.max(1));
    let (event_tx, event_rx) = ShellCore::channel(&config);

    // ── Build ShellCore ──────────────────────────────────────────────────────
    let mut core = ShellCore::new(
        &config,
        Collaborators {
            engine: Arc::new(engine.clone()),
            favorites,
            session: session.clone(),
            context: context.clone(),
            bus,
        },
        broadcast_tx,
        event_tx,
    );
    let navigation = NavigationSignal::new();
    let cancel = CancelSource::new();
    core.activate(&navigation, &cancel);

    let shell = Shell {
        handle: core.handle(),
        store: core.store(),
        navigation,
        cancel,
        session,
        context,
        engine: engine.clone(),
    };

    let core_task = tokio::spawn(async move {
        if let Err(e) = core.run(event_rx).await {
            tracing::error!("ShellCore exited with error: {}", e);
        }
    });

    engine.load_playlist(demo_playlist());
    let ticker = engine.spawn_ticker(Duration::from_millis(
        config.playback.progress_interval_ms.max(1),
    ));

    println!("{}", input::HELP);

    // ── Input / broadcast loop ───────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match input::parse(&line) {
                    Ok(command) => {
                        if !shell.dispatch(command).await? {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            msg = broadcast_rx.recv() => match msg {
                Ok(ShellBroadcast::StateUpdated) => {
                    println!("{}", status::line(&shell.store.get_state().await));
                }
                Ok(ShellBroadcast::ExitRequested) => {
                    tracing::info!("exit requested by back navigation");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("status output lagged by {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    ticker.abort();
    if shell.handle.shutdown().await.is_ok() {
        let _ = core_task.await;
    }
    tracing::info!("laud stopped");
    Ok(())
}
