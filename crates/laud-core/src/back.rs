//! Back-navigation policy for the hardware cancel signal.
//!
//! One press closes one layer.  Priority, narrowest first:
//! Playlist → Playlists → PlayingTrack → exit the application.
//! Only one overlay is ever open, so a press either clears the slot or asks
//! the host to exit; tab and login state are never touched.

use laud_proto::nav::{NavState, Overlay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Closed { closed: Overlay, state: NavState },
    /// Nothing left to close; the host should exit.
    ExitRequested,
}

pub fn on_cancel_signal(state: &NavState) -> CancelOutcome {
    match state.active_overlay {
        Overlay::None => CancelOutcome::ExitRequested,
        closed @ (Overlay::Playlist | Overlay::Playlists | Overlay::PlayingTrack) => {
            CancelOutcome::Closed {
                closed,
                state: NavState {
                    active_overlay: Overlay::None,
                    ..*state
                },
            }
        }
    }
}
