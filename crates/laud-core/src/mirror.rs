//! PlaybackMirror: render-ready readings of engine + favorites truth.
//!
//! Every reading re-fetches track, position, play state and repeat mode from
//! the engine and recomputes `favorite` from the favorites collection; nothing
//! is carried over from an earlier snapshot.  A reading draws its ticket
//! before the first engine call, and `LatestSnapshot` only takes a reading
//! whose ticket is newer than the one it holds.  Readings may overlap and
//! finish in any order; the one that started last wins.
//!
//! If any engine read fails the reading is abandoned and the previous snapshot
//! stays in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use laud_proto::playback::{PlaybackCommand, PlaybackSnapshot, PlayerState, SkipDirection};
use laud_proto::protocol::BusMessage;
use tracing::{debug, info};

use crate::bus::MessageBus;
use crate::context::PlaybackContext;
use crate::engine::{AudioEngine, FavoritesCollection};
use crate::error::MirrorError;

/// One full re-read, ordered by `ticket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub ticket: u64,
    pub snapshot: PlaybackSnapshot,
}

/// The newest reading applied so far.
#[derive(Debug, Default)]
pub struct LatestSnapshot {
    ticket: u64,
    snapshot: PlaybackSnapshot,
}

impl LatestSnapshot {
    pub fn get(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    /// Replace the snapshot as a whole.  Returns `false` and keeps the current
    /// one when `reading` started before it.
    pub fn accept(&mut self, reading: Reading) -> bool {
        if reading.ticket <= self.ticket {
            debug!(
                "mirror: discarding reading {} (holding {})",
                reading.ticket, self.ticket
            );
            return false;
        }
        self.ticket = reading.ticket;
        self.snapshot = reading.snapshot;
        true
    }
}

/// Runs playback commands against the engine and reads truth back.  Cheap to
/// clone; every clone shares one ticket counter.
#[derive(Clone)]
pub struct PlaybackMirror {
    engine: Arc<dyn AudioEngine>,
    favorites: Arc<dyn FavoritesCollection>,
    context: Arc<PlaybackContext>,
    bus: MessageBus,
    tickets: Arc<AtomicU64>,
}

impl PlaybackMirror {
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        favorites: Arc<dyn FavoritesCollection>,
        context: Arc<PlaybackContext>,
        bus: MessageBus,
    ) -> Self {
        Self {
            engine,
            favorites,
            context,
            bus,
            tickets: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Full re-read of current truth.
    pub async fn read(&self) -> Result<Reading, MirrorError> {
        let ticket = self.tickets.fetch_add(1, Ordering::AcqRel) + 1;

        let track = self.engine.current_track().await?;
        let position_ms = self.engine.position_ms().await?;
        let paused = self.engine.playback_state().await? == PlayerState::Paused;
        let repeat_mode = self.engine.repeat_mode().await?;

        let (position_ms, favorite) = match &track {
            Some(t) => (position_ms.min(t.duration_ms), self.favorites.contains(&t.id)),
            None => (0, false),
        };

        Ok(Reading {
            ticket,
            snapshot: PlaybackSnapshot {
                track,
                position_ms,
                paused,
                favorite,
                playlist: self.context.current_playlist(),
                repeat_mode,
                forced_pause: self.context.forced_pause(),
            },
        })
    }

    pub async fn apply(&self, command: PlaybackCommand) -> Result<Reading, MirrorError> {
        match command {
            PlaybackCommand::TogglePlayback => self.toggle_playback().await,
            PlaybackCommand::ToggleFavorite => self.toggle_favorite().await,
            PlaybackCommand::Skip { direction } => self.skip(direction).await,
            PlaybackCommand::CycleRepeat => self.cycle_repeat().await,
            PlaybackCommand::Seek { position_ms } => self.seek(position_ms).await,
            PlaybackCommand::Shuffle => self.shuffle().await,
        }
    }

    pub async fn toggle_playback(&self) -> Result<Reading, MirrorError> {
        match self.engine.playback_state().await? {
            PlayerState::Paused => self.engine.play().await?,
            PlayerState::Playing => self.engine.pause().await?,
        }
        self.read().await
    }

    /// Flip the loaded track's membership in the favorites collection.  The
    /// target comes from the collection itself, so writes made elsewhere are
    /// honoured.
    pub async fn toggle_favorite(&self) -> Result<Reading, MirrorError> {
        if self.context.is_offline() {
            return Err(MirrorError::Offline);
        }
        let Some(track) = self.engine.current_track().await? else {
            return Err(MirrorError::NoTrack);
        };

        let target = !self.favorites.contains(&track.id);
        self.favorites.set(&track.id, target).await?;
        info!("mirror: favorite {} → {}", track.id, target);
        self.read().await
    }

    /// The engine decides what "no next/previous track" means.
    pub async fn skip(&self, direction: SkipDirection) -> Result<Reading, MirrorError> {
        match direction {
            SkipDirection::Next => self.engine.skip_next().await?,
            SkipDirection::Previous => self.engine.skip_previous().await?,
        }
        self.read().await
    }

    /// Ask the engine to advance its repeat mode and adopt whatever it reports.
    /// The next mode is never computed here.
    pub async fn cycle_repeat(&self) -> Result<Reading, MirrorError> {
        self.engine.advance_repeat_mode().await?;
        let reading = self.read().await?;
        info!("mirror: repeat now {:?}", reading.snapshot.repeat_mode);
        Ok(reading)
    }

    pub async fn seek(&self, position_ms: u64) -> Result<Reading, MirrorError> {
        if self.context.is_listening_along() {
            return Err(MirrorError::SeekLocked);
        }
        self.engine.seek_to(position_ms).await?;
        self.bus.publish(&BusMessage::Seek { position_ms });
        self.read().await
    }

    pub async fn shuffle(&self) -> Result<Reading, MirrorError> {
        self.engine.shuffle_queue().await?;
        self.read().await
    }
}
