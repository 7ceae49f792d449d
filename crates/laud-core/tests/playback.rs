//! PlaybackMirror behaviour through a running ShellCore.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{track, Harness};
use laud_core::engine::{AudioEngine, FavoritesCollection};
use laud_core::ShellEvent;
use laud_proto::config::Config;
use laud_proto::nav::{Overlay, PageCommand};
use laud_proto::playback::{EngineEventKind, PlaybackCommand, RepeatMode, SkipDirection};
use laud_proto::protocol::{BusMessage, TOPIC_SEEK};

fn next() -> PlaybackCommand {
    PlaybackCommand::Skip {
        direction: SkipDirection::Next,
    }
}

fn previous() -> PlaybackCommand {
    PlaybackCommand::Skip {
        direction: SkipDirection::Previous,
    }
}

fn current_id(snap: &laud_proto::playback::PlaybackSnapshot) -> Option<&str> {
    snap.track.as_ref().map(|t| t.id.as_str())
}

#[tokio::test]
async fn test_snapshot_follows_loaded_playlist() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;

    let snap = h.settle().await.playback;
    assert_eq!(snap.track.as_ref().map(|t| t.id.as_str()), Some("a"));
    assert_eq!(snap.position_ms, 0);
    assert!(snap.paused);
    assert_eq!(snap.playlist.map(|p| p.id), Some("pl-1".to_string()));
}

#[tokio::test]
async fn test_track_change_during_pending_seek_reads_post_seek_position() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap();
    h.settle().await;
    h.engine.sim.advance(5_000);
    assert_eq!(h.settle().await.playback.position_ms, 5_000);

    h.engine.arm_seek();
    assert!(h
        .handle
        .playback(PlaybackCommand::Seek {
            position_ms: 30_000
        })
        .await
        .unwrap());
    h.engine.seek_entered().await;

    // Both land in the queue while the seek is still in flight.
    h.engine.sim.advance(1_000);
    h.engine.sim.emit(EngineEventKind::TrackChanged);

    h.engine.release_seek();
    let snap = h.settle().await.playback;
    assert_eq!(snap.position_ms, 30_000);
    assert_eq!(snap.track.map(|t| t.id), Some("a".to_string()));
}

#[tokio::test]
async fn test_seek_publishes_on_bus() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    let seen = Arc::new(AtomicU64::new(0));
    let s = seen.clone();
    let _sub = h.bus.subscribe(TOPIC_SEEK, move |msg| {
        if let BusMessage::Seek { position_ms } = msg {
            s.store(*position_ms, Ordering::SeqCst);
        }
    });

    h.handle
        .playback(PlaybackCommand::Seek {
            position_ms: 42_000,
        })
        .await
        .unwrap();
    assert_eq!(h.settle().await.playback.position_ms, 42_000);
    assert_eq!(seen.load(Ordering::SeqCst), 42_000);
}

#[tokio::test]
async fn test_seek_locked_while_listening_along() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.context.set_listening_along(true);

    h.handle
        .playback(PlaybackCommand::Seek {
            position_ms: 10_000,
        })
        .await
        .unwrap();
    assert_eq!(h.settle().await.playback.position_ms, 0);
}

#[tokio::test]
async fn test_favorite_double_toggle_restores_original() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    assert!(!h.settle().await.playback.favorite);

    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    assert!(h.settle().await.playback.favorite);
    assert!(h.favorites.contains("a"));

    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    assert!(!h.settle().await.playback.favorite);
    assert!(!h.favorites.contains("a"));
}

#[tokio::test]
async fn test_failed_favorite_write_keeps_flag() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.favorites.set_available(false);

    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    assert!(!h.settle().await.playback.favorite);
}

#[tokio::test]
async fn test_favorite_blocked_offline() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.context.set_offline(true);

    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    assert!(!h.settle().await.playback.favorite);
    assert!(!h.favorites.contains("a"));
}

#[tokio::test]
async fn test_favorite_without_track_issues_no_write() {
    let h = Harness::start(Some("ada")).await;
    assert!(h.settle().await.playback.track.is_none());

    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    let snap = h.settle().await.playback;
    assert!(snap.track.is_none());
    assert!(!snap.favorite);
    assert_eq!(h.favorites.writes(), 0);
}

#[tokio::test]
async fn test_favorite_toggle_reads_collection_not_last_snapshot() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    assert!(!h.settle().await.playback.favorite);

    // Another screen marks the track without any engine callback.
    h.favorites.store.set("a", true).await.unwrap();

    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    assert!(!h.settle().await.playback.favorite);
    assert!(!h.favorites.contains("a"));
    assert_eq!(h.favorites.writes(), 1);
}

#[tokio::test]
async fn test_favorite_recomputed_on_track_change() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.handle
        .playback(PlaybackCommand::ToggleFavorite)
        .await
        .unwrap();
    assert!(h.settle().await.playback.favorite);

    h.handle.playback(next()).await.unwrap();
    let snap = h.settle().await.playback;
    assert_eq!(snap.track.map(|t| t.id), Some("b".to_string()));
    assert!(!snap.favorite);
}

#[tokio::test]
async fn test_repeat_cycles_back_to_off() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    assert_eq!(h.settle().await.playback.repeat_mode, RepeatMode::Off);

    let mut seen = Vec::new();
    for _ in 0..3 {
        h.handle
            .playback(PlaybackCommand::CycleRepeat)
            .await
            .unwrap();
        seen.push(h.settle().await.playback.repeat_mode);
    }
    assert_eq!(seen, vec![RepeatMode::Queue, RepeatMode::Track, RepeatMode::Off]);
}

#[tokio::test]
async fn test_unavailable_engine_keeps_last_snapshot() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.handle
        .playback(PlaybackCommand::Seek {
            position_ms: 12_000,
        })
        .await
        .unwrap();
    let before = h.settle().await;

    h.engine.sim.set_available(false);
    h.engine.sim.emit(EngineEventKind::ProgressTick);
    h.handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap();

    let after = h.settle().await;
    assert_eq!(after.playback, before.playback);
    assert_eq!(after.rev, before.rev);
}

#[tokio::test]
async fn test_rapid_toggles_are_dropped_while_pending() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;

    assert!(h
        .handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap());
    assert!(!h
        .handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap());
    assert!(!h.settle().await.playback.paused);

    // Handled, so the next one goes through.
    assert!(h
        .handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap());
    assert!(h.settle().await.playback.paused);
}

#[tokio::test]
async fn test_rapid_toggles_all_apply_when_debounce_disabled() {
    let mut config = Config::default();
    config.playback.ignore_while_pending = false;
    let h = Harness::start_with(config, Some("ada"))
        .await
        .with_playlist()
        .await;

    for _ in 0..2 {
        assert!(h
            .handle
            .playback(PlaybackCommand::TogglePlayback)
            .await
            .unwrap());
    }
    assert!(h.settle().await.playback.paused);
}

#[tokio::test]
async fn test_skip_previous_on_first_track_stays_put() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;

    assert!(h.handle.playback(previous()).await.unwrap());
    let snap = h.settle().await.playback;
    assert_eq!(current_id(&snap), Some("a"));
    assert_eq!(snap.position_ms, 0);

    // Slot released, so skipping works again.
    assert!(h.handle.playback(next()).await.unwrap());
    assert_eq!(current_id(&h.settle().await.playback), Some("b"));
}

#[tokio::test]
async fn test_skip_next_on_last_track_is_noop() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    for _ in 0..2 {
        h.handle.playback(next()).await.unwrap();
        h.settle().await;
    }
    h.handle
        .playback(PlaybackCommand::Seek {
            position_ms: 10_000,
        })
        .await
        .unwrap();
    let before = h.settle().await;
    assert_eq!(current_id(&before.playback), Some("c"));

    assert!(h.handle.playback(next()).await.unwrap());
    let after = h.settle().await;
    assert_eq!(after.playback, before.playback);
    assert_eq!(after.rev, before.rev);

    // Late in the track, previous restarts it.
    assert!(h.handle.playback(previous()).await.unwrap());
    let snap = h.settle().await.playback;
    assert_eq!(current_id(&snap), Some("c"));
    assert_eq!(snap.position_ms, 0);
}

#[tokio::test]
async fn test_shuffle_keeps_current_track() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.handle.playback(next()).await.unwrap();
    assert_eq!(current_id(&h.settle().await.playback), Some("b"));

    h.handle.playback(PlaybackCommand::Shuffle).await.unwrap();
    let snap = h.settle().await.playback;
    assert_eq!(current_id(&snap), Some("b"));
    assert_eq!(snap.playlist.map(|p| p.id), Some("pl-1".to_string()));

    let queue = h.engine.sim.queue();
    assert_eq!(queue[0].id, "b");
    let mut ids: Vec<_> = queue.into_iter().map(|t| t.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_track_change_on_full_queue_still_reaches_snapshot() {
    let mut config = Config::default();
    config.core.queue_capacity = 2;
    let h = Harness::start_with(config, Some("ada"))
        .await
        .with_playlist()
        .await;

    // Nothing runs the loop in between, so the track change finds the queue full.
    h.handle.post(ShellEvent::SelectTab(1));
    h.handle.post(ShellEvent::SelectTab(2));
    h.engine.sim.load_tracks(vec![track("z", 90_000)]);

    let state = h.settle().await;
    assert_eq!(current_id(&state.playback), Some("z"));
    assert!(state.playback.playlist.is_none());
}

#[tokio::test]
async fn test_queue_end_shows_paused_at_end() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    for _ in 0..2 {
        h.handle.playback(next()).await.unwrap();
        h.settle().await;
    }
    h.handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap();
    assert_eq!(
        h.settle().await.playback.track.map(|t| t.id),
        Some("c".to_string())
    );

    h.engine.sim.advance(300_000);
    let snap = h.settle().await.playback;
    assert!(snap.paused);
    assert_eq!(snap.position_ms, 240_000);
    assert_eq!(snap.progress(), 1.0);
}

#[tokio::test]
async fn test_forced_pause_shows_paused() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;
    h.handle
        .playback(PlaybackCommand::TogglePlayback)
        .await
        .unwrap();
    assert!(!h.settle().await.playback.display_paused());

    h.context.set_forced_pause(true);
    h.engine.sim.emit(EngineEventKind::StateChanged);
    let snap = h.settle().await.playback;
    assert!(!snap.paused);
    assert!(snap.forced_pause);
    assert!(snap.display_paused());
}

#[tokio::test]
async fn test_opening_playing_view_refreshes() {
    let h = Harness::start(Some("ada")).await.with_playlist().await;

    // Moves the engine without firing any callback.
    h.engine.sim.seek_to(7_000).await.unwrap();
    assert_eq!(h.settle().await.playback.position_ms, 0);

    h.handle.navigate(PageCommand::Playing).await.unwrap();
    let state = h.settle().await;
    assert_eq!(state.nav.active_overlay, Overlay::PlayingTrack);
    assert_eq!(state.playback.position_ms, 7_000);
}
