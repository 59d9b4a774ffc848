use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pmoconfig::Config;
use pmoqueueview::{
    CatalogEntry, DisplayItem, InMemorySession, MediaSessionConnection, MemoryPreferences,
    NowPlaying, PlaybackSnapshot, PlaybackState, PreviousBoundary, QueueViewError, QueueViewModel,
    QueueViewSettings, TransportCommand,
};

const QUEUE: &str = "album:42";

fn entries(ids: &[&str]) -> Vec<CatalogEntry> {
    ids.iter()
        .map(|id| CatalogEntry::new(*id, format!("Track {}", id)).with_duration_ms(200_000))
        .collect()
}

fn session_with(ids: &[&str]) -> Arc<InMemorySession> {
    let session = Arc::new(InMemorySession::new("root"));
    session.load_children(QUEUE, entries(ids));
    session
}

fn view_with(
    session: &Arc<InMemorySession>,
    preferences: MemoryPreferences,
    settings: QueueViewSettings,
) -> QueueViewModel {
    let view = QueueViewModel::new(QUEUE, Arc::new(preferences), session.clone(), settings).unwrap();
    view.flush().unwrap();
    view
}

fn view(session: &Arc<InMemorySession>) -> QueueViewModel {
    view_with(session, MemoryPreferences::new(), QueueViewSettings::default())
}

fn current_id(view: &QueueViewModel) -> Option<String> {
    view.current_item()
        .value()
        .flatten()
        .map(|item| item.id().to_string())
}

fn playing_ids(view: &QueueViewModel) -> Vec<String> {
    view.items()
        .value_or_default()
        .iter()
        .filter(|item| item.is_playing())
        .map(|item| item.id().to_string())
        .collect()
}

#[test]
fn test_catalog_load_selects_first_item() {
    let session = session_with(&["a", "b", "c"]);
    let view = view(&session);

    let items: Vec<DisplayItem> = view.items().value().unwrap();
    assert_eq!(
        items.iter().map(|i| i.id()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert_eq!(current_id(&view).as_deref(), Some("a"));
    assert!(playing_ids(&view).is_empty());
}

#[test]
fn test_catalog_load_prefers_last_played() {
    let session = session_with(&["a", "b", "c"]);
    let view = view_with(
        &session,
        MemoryPreferences::new().with("last_played_id", "b"),
        QueueViewSettings::default(),
    );
    assert_eq!(current_id(&view).as_deref(), Some("b"));
}

#[test]
fn test_catalog_load_prefers_playing_item() {
    let session = session_with(&["a", "b", "c"]);
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    session.set_now_playing(NowPlaying::new("c", 0));

    let view = view_with(
        &session,
        MemoryPreferences::new().with("last_played_id", "b"),
        QueueViewSettings::default(),
    );
    assert_eq!(current_id(&view).as_deref(), Some("c"));
    assert_eq!(playing_ids(&view), vec!["c"]);
}

#[test]
fn test_empty_catalog_has_no_current_item() {
    let session = session_with(&[]);
    let view = view(&session);

    assert_eq!(view.items().value(), Some(Vec::new()));
    assert_eq!(view.current_item().value(), Some(None));

    view.skip_to_next().unwrap();
    view.skip_to_previous().unwrap();
    view.flush().unwrap();
    assert_eq!(view.current_item().value(), Some(None));
}

#[test]
fn test_catalog_delivered_after_attach() {
    let session = Arc::new(InMemorySession::new("root"));
    let view = view(&session);
    assert_eq!(view.items().value(), None);

    session.load_children("elsewhere", entries(&["x"]));
    session.load_children(QUEUE, entries(&["a", "b"]));
    view.flush().unwrap();

    assert_eq!(view.items().value().map(|items| items.len()), Some(2));
    assert_eq!(current_id(&view).as_deref(), Some("a"));
}

#[test]
fn test_metadata_change_flags_now_playing() {
    let session = session_with(&["a", "b", "c"]);
    let view = view(&session);

    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    session.set_now_playing(NowPlaying::new("b", 180_000));
    view.flush().unwrap();

    assert_eq!(playing_ids(&view), vec!["b"]);
    let current = view.current_item().value().flatten().unwrap();
    assert_eq!(current.id(), "b");
    assert!(current.is_playing());
    assert_eq!(current.duration_ms(), 180_000);
    assert_eq!(view.playback_state().value().unwrap().state, PlaybackState::Playing);
}

#[test]
fn test_state_change_reflags_items() {
    let session = session_with(&["a", "b"]);
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    session.set_now_playing(NowPlaying::new("a", 1_000));
    let view = view(&session);
    assert_eq!(playing_ids(&view), vec!["a"]);

    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Paused, 500));
    view.flush().unwrap();

    assert!(playing_ids(&view).is_empty());
    let current = view.current_item().value().flatten().unwrap();
    assert_eq!(current.id(), "a");
    assert!(!current.is_playing());
}

#[test]
fn test_nothing_playing_keeps_items() {
    let session = session_with(&["a", "b"]);
    let view = view(&session);
    let items_rx = view.items().subscribe();
    assert!(items_rx.try_recv().is_ok());

    session.set_now_playing(NowPlaying::nothing());
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Stopped, 0));
    view.flush().unwrap();

    assert!(items_rx.try_recv().is_err());
    assert_eq!(view.playback_state().value().unwrap().state, PlaybackState::Stopped);
}

#[test]
fn test_now_playing_outside_catalog_is_a_fault() {
    let session = session_with(&["a", "b"]);
    let view = view(&session);
    let before = view.items().value();

    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    session.set_now_playing(NowPlaying::new("zz", 90_000));
    view.flush().unwrap();

    assert_eq!(
        view.faults().value(),
        Some(QueueViewError::NowPlayingNotInCatalog(
            "zz".to_string(),
            QUEUE.to_string()
        ))
    );
    assert_eq!(view.items().value(), before);
    assert_eq!(current_id(&view).as_deref(), Some("a"));
}

#[test]
fn test_now_playing_before_catalog_is_not_a_fault() {
    let session = Arc::new(InMemorySession::new("root"));
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    session.set_now_playing(NowPlaying::new("a", 90_000));
    let view = view(&session);

    assert_eq!(view.faults().value(), None);

    session.load_children(QUEUE, entries(&["a", "b"]));
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("a"));
    assert_eq!(playing_ids(&view), vec!["a"]);
}

#[test]
fn test_skip_to_next_moves_locally() {
    let session = session_with(&["a", "b", "c"]);
    let view = view(&session);

    view.skip_to_next().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("b"));

    view.skip_to_next().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("c"));

    view.skip_to_next().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("c"));
    assert!(session.transport().commands().is_empty());
}

#[test]
fn test_skip_delegates_when_started() {
    let session = session_with(&["a", "b", "c"]);
    session.set_started(true);
    let view = view(&session);

    view.skip_to_next().unwrap();
    view.skip_to_previous().unwrap();
    view.flush().unwrap();

    assert_eq!(
        session.transport().commands(),
        vec![TransportCommand::SkipToNext, TransportCommand::SkipToPrevious]
    );
    assert_eq!(current_id(&view).as_deref(), Some("a"));
}

#[test]
fn test_skip_to_previous_from_second_item() {
    let session = session_with(&["a", "b", "c"]);
    let view = view_with(
        &session,
        MemoryPreferences::new().with("last_played_id", "b"),
        QueueViewSettings::default(),
    );

    view.skip_to_previous().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("a"));

    view.skip_to_previous().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("a"));
}

#[test]
fn test_skip_to_previous_second_item_boundary() {
    let session = session_with(&["a", "b", "c"]);
    let view = view_with(
        &session,
        MemoryPreferences::new().with("last_played_id", "c"),
        QueueViewSettings::default().with_previous_boundary(PreviousBoundary::SecondItem),
    );

    view.skip_to_previous().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("b"));

    view.skip_to_previous().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("b"));
}

#[test]
fn test_play_or_toggle() {
    let session = session_with(&["a", "b"]);
    let view = view(&session);

    // Not the now-playing item: play from id
    view.play_or_toggle("a").unwrap();

    session.set_now_playing(NowPlaying::new("a", 200_000));
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    view.play_or_toggle("a").unwrap();

    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Buffering, 0));
    view.play_or_toggle("a").unwrap();

    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Paused, 0));
    view.play_or_toggle("a").unwrap();

    // Another item while "a" is loaded
    view.play_or_toggle("b").unwrap();

    // Same id but the session is not prepared
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Paused, 0).with_prepared(false));
    view.play_or_toggle("a").unwrap();

    assert_eq!(
        session.transport().commands(),
        vec![
            TransportCommand::PlayFromId("a".to_string()),
            TransportCommand::Pause,
            TransportCommand::Pause,
            TransportCommand::Play,
            TransportCommand::PlayFromId("b".to_string()),
            TransportCommand::PlayFromId("a".to_string()),
        ]
    );
}

#[test]
fn test_play_or_toggle_ignores_stopped_unprepared_state() {
    let session = session_with(&["a"]);
    let view = view(&session);
    session.set_now_playing(NowPlaying::new("a", 0));
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Error("boom".into()), 0).with_prepared(true));

    view.play_or_toggle("a").unwrap();
    assert!(session.transport().commands().is_empty());
}

#[test]
fn test_transport_errors_are_returned() {
    let session = session_with(&["a"]);
    let view = view(&session);
    session.transport().set_failing(true);

    let err = view.play_or_toggle("a").unwrap_err();
    assert!(matches!(err, QueueViewError::Transport(ref cmd, _) if cmd == "play_from_id"));
}

#[test]
fn test_position_is_published_once_per_change() {
    let session = session_with(&["a"]);
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Paused, 5_000));
    let view = view_with(
        &session,
        MemoryPreferences::new(),
        QueueViewSettings::default().with_position_poll_interval(Duration::from_millis(20)),
    );

    let rx = view.position().subscribe();
    let mut seen = Vec::new();
    while let Ok(position) = rx.recv_timeout(Duration::from_secs(2)) {
        seen.push(position);
        if position == 5_000 {
            break;
        }
    }
    assert_eq!(seen.last(), Some(&5_000));

    // Paused: the sampled value does not move, nothing new is published
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Paused, 7_500));
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).ok(), Some(7_500));
    assert_eq!(view.position().value(), Some(7_500));
}

#[test]
fn test_position_near_max_keeps_worker_alive() {
    let session = session_with(&["a", "b"]);
    let view = view_with(
        &session,
        MemoryPreferences::new(),
        QueueViewSettings::default().with_position_poll_interval(Duration::from_millis(10)),
    );

    let started = Instant::now()
        .checked_sub(Duration::from_secs(5))
        .unwrap_or_else(Instant::now);
    session.set_playback_state(
        PlaybackSnapshot::new(PlaybackState::Playing, i64::MAX - 10).with_updated_at(started),
    );

    let rx = view.position().subscribe();
    let mut last = None;
    while let Ok(position) = rx.recv_timeout(Duration::from_millis(500)) {
        last = Some(position);
        if position == i64::MAX {
            break;
        }
    }
    assert_eq!(last, Some(i64::MAX));

    view.skip_to_next().unwrap();
    view.flush().unwrap();
    assert!(!view.is_disposed());
    assert_eq!(current_id(&view).as_deref(), Some("b"));
}

#[test]
fn test_dispose_stops_position_updates() {
    let session = session_with(&["a"]);
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    let view = view_with(
        &session,
        MemoryPreferences::new(),
        QueueViewSettings::default().with_position_poll_interval(Duration::from_millis(10)),
    );

    let rx = view.position().subscribe();
    // Playing: the extrapolated position keeps moving
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());

    view.dispose();
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_dispose_from_observer_stops_publishing() {
    let session = session_with(&["a", "b", "c"]);
    let view = Arc::new(view(&session));

    let handle = Arc::downgrade(&view);
    view.current_item().observe(move |current| {
        if current.as_ref().map(|item| item.id()) == Some("b") {
            if let Some(view) = handle.upgrade() {
                view.dispose();
            }
        }
    });

    view.skip_to_next().unwrap();
    // Either queued behind the first skip and dropped, or refused
    let _ = view.skip_to_next();

    let deadline = Instant::now() + Duration::from_secs(2);
    while !view.is_disposed() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(view.is_disposed());
    thread::sleep(Duration::from_millis(100));
    assert_eq!(current_id(&view).as_deref(), Some("b"));
}

#[test]
fn test_dispose_detaches_everything() {
    let session = session_with(&["a", "b"]);
    let view = view(&session);
    assert_eq!(session.subscriber_count(QUEUE), 1);
    assert_eq!(session.playback_state().observer_count(), 1);
    assert_eq!(session.now_playing().observer_count(), 1);

    view.dispose();
    assert!(view.is_disposed());
    assert_eq!(session.subscriber_count(QUEUE), 0);
    assert_eq!(session.playback_state().observer_count(), 0);
    assert_eq!(session.now_playing().observer_count(), 0);

    let items = view.items().value();
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    session.set_now_playing(NowPlaying::new("b", 1_000));
    session.load_children(QUEUE, entries(&["z"]));
    assert_eq!(view.items().value(), items);

    assert!(matches!(view.skip_to_next(), Err(QueueViewError::Disposed(_))));
    assert!(matches!(view.play_or_toggle("a"), Err(QueueViewError::Disposed(_))));
    assert!(matches!(view.flush(), Err(QueueViewError::Disposed(_))));

    // Second call is a no-op
    view.dispose();
}

#[test]
fn test_drop_disposes() {
    let session = session_with(&["a"]);
    {
        let _view = view(&session);
        assert_eq!(session.subscriber_count(QUEUE), 1);
    }
    assert_eq!(session.subscriber_count(QUEUE), 0);
    assert_eq!(session.now_playing().observer_count(), 0);
}

#[test]
fn test_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(Config::load_config(dir.path().to_str().unwrap()).unwrap());
    config.set_preference("last_played_id", "c").unwrap();
    config.set_previous_boundary("second_item".to_string()).unwrap();

    let session = session_with(&["a", "b", "c"]);
    let view = QueueViewModel::from_config(QUEUE, config, session.clone()).unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("c"));

    view.skip_to_previous().unwrap();
    view.skip_to_previous().unwrap();
    view.flush().unwrap();
    assert_eq!(current_id(&view).as_deref(), Some("b"));
}

#[test]
fn test_new_observer_receives_last_items() {
    let session = session_with(&["a", "b"]);
    let view = view(&session);

    let rx = view.items().subscribe();
    let items = rx.try_recv().unwrap();
    assert_eq!(items.len(), 2);

    let current_rx = view.current_item().subscribe();
    assert_eq!(
        current_rx.try_recv().unwrap().map(|i| i.id().to_string()),
        Some("a".to_string())
    );
}
