use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("audio engine unavailable: {0}")]
    Unavailable(String),

    #[error("audio engine rejected {0}")]
    Rejected(String),

    #[error("audio engine closed")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FavoritesError {
    #[error("favorites store unavailable: {0}")]
    Unavailable(String),

    #[error("favorites store rejected track {0}")]
    Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no stored credentials")]
    NotSignedIn,

    #[error("session handshake failed: {0}")]
    Handshake(String),
}

/// Why a playback command left the snapshot untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Favorites(#[from] FavoritesError),

    #[error("no track loaded")]
    NoTrack,

    #[error("favorites are unavailable offline")]
    Offline,

    #[error("seeking is locked while listening along")]
    SeekLocked,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("shell core is not running")]
    Closed,
}
