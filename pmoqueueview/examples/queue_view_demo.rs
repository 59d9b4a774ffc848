//! Drives a queue view over the in-memory session and prints what a queue
//! screen would display.
//!
//! Usage:
//!   cargo run -p pmoqueueview --example queue_view_demo
//!   RUST_LOG=pmoqueueview=debug cargo run -p pmoqueueview --example queue_view_demo

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use pmoconfig::Config;
use pmoqueueview::{
    CatalogEntry, DisplayItem, InMemorySession, NowPlaying, PlaybackSnapshot, PlaybackState,
    QueueViewModel,
};
use tracing_subscriber::EnvFilter;

const QUEUE: &str = "album:kind-of-blue";

const CATALOG: &str = r#"[
    {"id": "kob-1", "title": "So What", "subtitle": "Miles Davis", "duration_ms": 562000},
    {"id": "kob-2", "title": "Freddie Freeloader", "subtitle": "Miles Davis", "duration_ms": 586000},
    {"id": "kob-3", "title": "Blue in Green", "subtitle": "Miles Davis", "duration_ms": 337000},
    {"id": "kob-4", "title": "All Blues", "subtitle": "Miles Davis", "duration_ms": 693000},
    {"id": "kob-5", "title": "Flamenco Sketches", "subtitle": "Miles Davis", "duration_ms": 566000}
]"#;

fn print_items(label: &str, items: &[DisplayItem]) {
    println!("--- {label}");
    for item in items {
        let marker = match (item.is_playing(), item.is_buffering()) {
            (true, true) => "~",
            (true, false) => ">",
            _ => " ",
        };
        println!(
            "{marker} {:<20} {:<12} {}",
            item.title(),
            item.subtitle().unwrap_or(""),
            item.duration_label().unwrap_or_default()
        );
    }
}

fn main() -> Result<()> {
    let config = Arc::new(Config::in_memory());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level().unwrap_or_default().to_lowercase()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    config.set_preference("last_played_id", "kob-3")?;

    let session = Arc::new(InMemorySession::new("root"));
    session.load_children(QUEUE, CatalogEntry::list_from_json(CATALOG)?);

    let view = QueueViewModel::from_config(QUEUE, Arc::clone(&config), session.clone())?;
    view.flush()?;

    let positions = view.position().subscribe();
    let position_printer = thread::spawn(move || {
        while let Ok(position) = positions.recv_timeout(Duration::from_millis(600)) {
            println!("position {} ms", position);
        }
    });

    print_items("loaded", &view.items().value_or_default());
    if let Some(current) = view.current_item().value().flatten() {
        println!("current: {}", current.title());
    }

    view.play_or_toggle("kob-3")?;
    session.set_now_playing(NowPlaying::new("kob-3", 337_000).with_title("Blue in Green"));
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Playing, 0));
    view.flush()?;
    print_items("playing", &view.items().value_or_default());

    thread::sleep(Duration::from_millis(350));

    view.play_or_toggle("kob-3")?;
    session.set_playback_state(PlaybackSnapshot::new(PlaybackState::Paused, 350));
    view.skip_to_next()?;
    view.flush()?;
    print_items("paused", &view.items().value_or_default());
    if let Some(current) = view.current_item().value().flatten() {
        println!("current after skip: {}", current.title());
    }

    println!("transport: {:?}", session.transport().commands());

    view.dispose();
    let _ = position_printer.join();
    Ok(())
}
