//! Navigation router: maps page commands onto `NavState`.
//!
//! Every command writes the whole overlay slot, so the result always has
//! exactly one overlay value no matter what state it started from.

use laud_proto::nav::{NavState, Overlay, PageCommand, TAB_COUNT};

pub fn apply(state: NavState, command: PageCommand) -> NavState {
    match command {
        PageCommand::Home => NavState {
            tab_index: 0,
            logged_in: true,
            active_overlay: Overlay::None,
        },
        // Session transitions always drop whatever overlay was up.
        PageCommand::Login => NavState {
            tab_index: 0,
            logged_in: false,
            active_overlay: Overlay::None,
        },
        PageCommand::Playlist => NavState {
            active_overlay: Overlay::Playlist,
            ..state
        },
        PageCommand::Playing => NavState {
            tab_index: 0,
            active_overlay: Overlay::PlayingTrack,
            ..state
        },
        PageCommand::Playlists => NavState {
            active_overlay: Overlay::Playlists,
            ..state
        },
    }
}

/// Tab bar selection.  Out-of-range indices leave the state alone.
pub fn select_tab(state: NavState, index: usize) -> NavState {
    if index >= TAB_COUNT {
        return state;
    }
    NavState {
        tab_index: index,
        ..state
    }
}
