use serde::{Deserialize, Serialize};

/// Engine repeat mode.  The engine owns the cycle; `next` mirrors its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    Queue,
    Track,
}

impl RepeatMode {
    /// Off → Queue → Track → Off
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Queue,
            RepeatMode::Queue => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Off,
        }
    }
}

/// Play/pause state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Paused,
    Playing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artwork: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Render-ready view of engine + favorites truth at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub track: Option<Track>,
    /// Never exceeds `track.duration_ms` while a track is loaded.
    pub position_ms: u64,
    pub paused: bool,
    pub favorite: bool,
    pub playlist: Option<Playlist>,
    pub repeat_mode: RepeatMode,
    /// Pause forced by an outside collaborator (e.g. listen-along host paused).
    #[serde(default)]
    pub forced_pause: bool,
}

impl PlaybackSnapshot {
    /// Paused as the controls should show it.
    pub fn display_paused(&self) -> bool {
        self.paused || self.forced_pause
    }

    pub fn duration_ms(&self) -> u64 {
        self.track.as_ref().map_or(0, |t| t.duration_ms)
    }

    /// Fraction of the track played, 0.0..=1.0.
    pub fn progress(&self) -> f64 {
        match self.duration_ms() {
            0 => 0.0,
            d => self.position_ms as f64 / d as f64,
        }
    }
}

/// The four engine callbacks the mirror reconciles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEventKind {
    ProgressTick,
    TrackChanged,
    QueueEnded,
    StateChanged,
}

impl EngineEventKind {
    pub const ALL: [EngineEventKind; 4] = [
        EngineEventKind::ProgressTick,
        EngineEventKind::TrackChanged,
        EngineEventKind::QueueEnded,
        EngineEventKind::StateChanged,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipDirection {
    Next,
    Previous,
}

/// User commands that mutate engine or favorites state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum PlaybackCommand {
    TogglePlayback,
    ToggleFavorite,
    Skip { direction: SkipDirection },
    CycleRepeat,
    Seek { position_ms: u64 },
    Shuffle,
}
