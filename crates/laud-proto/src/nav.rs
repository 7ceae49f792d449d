//! Navigation data: page commands, the overlay slot and the derived root view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of tabs in the home shell (Home, Search, Downloads, Settings).
pub const TAB_COUNT: usize = 4;

/// Abstract page requests produced by UI taps and the global navigation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageCommand {
    Home,
    Login,
    Playlist,
    Playing,
    Playlists,
}

impl PageCommand {
    pub const ALL: [PageCommand; 5] = [
        PageCommand::Home,
        PageCommand::Login,
        PageCommand::Playlist,
        PageCommand::Playing,
        PageCommand::Playlists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageCommand::Home => "Home",
            PageCommand::Login => "Login",
            PageCommand::Playlist => "Playlist",
            PageCommand::Playing => "Playing",
            PageCommand::Playlists => "Playlists",
        }
    }
}

impl fmt::Display for PageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page command: {0:?}")]
pub struct ParsePageCommandError(pub String);

impl FromStr for PageCommand {
    type Err = ParsePageCommandError;

    /// Page names are matched exactly, the way the navigation signal emits them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageCommand::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParsePageCommandError(s.to_string()))
    }
}

/// The single full-screen surface drawn above the tabbed shell.
///
/// One slot, one value: two overlays can never be visible at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Overlay {
    #[default]
    None,
    PlayingTrack,
    Playlists,
    Playlist,
}

impl Overlay {
    pub fn is_open(&self) -> bool {
        !matches!(self, Overlay::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Overlay::None => "none",
            Overlay::PlayingTrack => "playing",
            Overlay::Playlists => "playlists",
            Overlay::Playlist => "playlist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavState {
    /// Selected home-shell tab, always below `TAB_COUNT`.
    pub tab_index: usize,
    pub logged_in: bool,
    pub active_overlay: Overlay,
}

impl NavState {
    pub fn new(logged_in: bool) -> Self {
        Self {
            tab_index: 0,
            logged_in,
            active_overlay: Overlay::None,
        }
    }

    pub fn root_view(&self) -> RootView {
        if self.logged_in {
            RootView::Home {
                tab: self.tab_index,
                overlay: self.active_overlay,
            }
        } else {
            RootView::Login
        }
    }
}

impl Default for NavState {
    fn default() -> Self {
        Self::new(false)
    }
}

/// What the renderer draws at the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootView {
    Login,
    Home { tab: usize, overlay: Overlay },
}
