//! Contracts the shell consumes from its collaborators.  The core never holds
//! their authoritative state longer than one refresh and only changes it
//! through these calls.

use async_trait::async_trait;
use laud_proto::playback::{EngineEventKind, PlayerState, RepeatMode, Track};

use crate::error::{EngineError, FavoritesError, SessionError};
use crate::registration::Registration;

pub type EngineListener = Box<dyn Fn(EngineEventKind) + Send + Sync>;

#[async_trait]
pub trait AudioEngine: Send + Sync {
    async fn playback_state(&self) -> Result<PlayerState, EngineError>;
    async fn play(&self) -> Result<(), EngineError>;
    async fn pause(&self) -> Result<(), EngineError>;
    async fn seek_to(&self, position_ms: u64) -> Result<(), EngineError>;
    /// No-op when there is no next track.
    async fn skip_next(&self) -> Result<(), EngineError>;
    /// No-op when there is no previous track.
    async fn skip_previous(&self) -> Result<(), EngineError>;
    async fn position_ms(&self) -> Result<u64, EngineError>;
    async fn current_track(&self) -> Result<Option<Track>, EngineError>;
    async fn repeat_mode(&self) -> Result<RepeatMode, EngineError>;
    /// Move to the engine's next repeat mode.  The engine may clamp or refuse.
    async fn advance_repeat_mode(&self) -> Result<(), EngineError>;
    async fn shuffle_queue(&self) -> Result<(), EngineError>;

    /// Listen for one kind of engine callback until the registration is released.
    fn add_event_listener(&self, kind: EngineEventKind, listener: EngineListener) -> Registration;
}

#[async_trait]
pub trait FavoritesCollection: Send + Sync {
    fn contains(&self, track_id: &str) -> bool;
    async fn set(&self, track_id: &str, favorite: bool) -> Result<(), FavoritesError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Whether stored user data exists at startup.
    fn is_logged_in(&self) -> bool;
    /// Session handshake with the backend.  Publishes `login` on success.
    async fn login(&self) -> Result<(), SessionError>;
}
