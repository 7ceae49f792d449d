use laud_core::state::ShellState;
use laud_proto::nav::RootView;
use laud_proto::playback::RepeatMode;

/// One line per state revision, e.g.
/// `[12:04:31] #17 tab 0/playing | ▶ Nils Frahm - Says 1:05/8:19 ♥ repeat:queue`
pub fn line(state: &ShellState) -> String {
    let now = chrono::Local::now().format("%H:%M:%S");
    format!(
        "[{}] #{} {} | {}",
        now,
        state.rev,
        view(state),
        playback(state)
    )
}

fn view(state: &ShellState) -> String {
    match state.nav.root_view() {
        RootView::Login => "login".to_string(),
        RootView::Home { tab, overlay } if overlay.is_open() => {
            format!("tab {}/{}", tab, overlay.label())
        }
        RootView::Home { tab, .. } => format!("tab {}", tab),
    }
}

fn playback(state: &ShellState) -> String {
    let pb = &state.playback;
    let Some(track) = &pb.track else {
        return "nothing loaded".to_string();
    };

    let icon = if pb.display_paused() { "⏸" } else { "▶" };
    let mut out = format!(
        "{} {} - {} {}/{}",
        icon,
        track.artist,
        track.title,
        clock(pb.position_ms),
        clock(track.duration_ms)
    );
    if pb.favorite {
        out.push_str(" ♥");
    }
    match pb.repeat_mode {
        RepeatMode::Off => {}
        RepeatMode::Queue => out.push_str(" repeat:queue"),
        RepeatMode::Track => out.push_str(" repeat:track"),
    }
    if let Some(playlist) = &pb.playlist {
        out.push_str(&format!(" [{}]", playlist.name));
    }
    out
}

fn clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use laud_proto::nav::{NavState, Overlay};
    use laud_proto::playback::{PlaybackSnapshot, Track};

    #[test]
    fn test_clock() {
        assert_eq!(clock(0), "0:00");
        assert_eq!(clock(65_400), "1:05");
        assert_eq!(clock(600_000), "10:00");
    }

    #[test]
    fn test_view_labels() {
        let mut state = ShellState::default();
        assert_eq!(view(&state), "login");

        state.nav = NavState {
            tab_index: 2,
            logged_in: true,
            active_overlay: Overlay::Playlists,
        };
        assert_eq!(view(&state), "tab 2/playlists");
    }

    #[test]
    fn test_playback_summary() {
        let mut state = ShellState::default();
        assert_eq!(playback(&state), "nothing loaded");

        state.playback = PlaybackSnapshot {
            track: Some(Track {
                id: "t1".into(),
                title: "Says".into(),
                artist: "Nils Frahm".into(),
                duration_ms: 499_000,
                artwork: None,
                url: None,
            }),
            position_ms: 65_000,
            paused: false,
            favorite: true,
            repeat_mode: RepeatMode::Queue,
            ..Default::default()
        };
        assert_eq!(
            playback(&state),
            "▶ Nils Frahm - Says 1:05/8:19 ♥ repeat:queue"
        );

        state.playback.forced_pause = true;
        assert!(playback(&state).starts_with("⏸"));
    }
}
