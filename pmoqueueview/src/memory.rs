//! In-process media session and preference store.
//!
//! `InMemorySession` keeps one catalog per queue id, records transport
//! commands instead of playing anything, and lets the caller drive
//! `now_playing` / `playback_state` by hand. It backs the demo and the
//! integration tests, and is a starting point for embedding the view model
//! over a local player.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::capabilities::PlaybackSnapshot;
use crate::errors::QueueViewError;
use crate::live::LiveValue;
use crate::model::{CatalogEntry, NowPlaying};
use crate::session::{CatalogSubscriber, MediaSessionConnection, PreferenceReader, TransportControls};

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A command received by [`MemoryTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    PlayFromId(String),
    SkipToNext,
    SkipToPrevious,
}

/// Records every command; can be switched to fail them.
#[derive(Default)]
pub struct MemoryTransport {
    commands: Mutex<Vec<TransportCommand>>,
    failing: AtomicBool,
}

impl MemoryTransport {
    pub fn commands(&self) -> Vec<TransportCommand> {
        lock(&self.commands).clone()
    }

    pub fn clear(&self) {
        lock(&self.commands).clear();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, name: &str, command: TransportCommand) -> Result<(), QueueViewError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueueViewError::transport(name, "transport unavailable"));
        }
        debug!(?command, "Transport command");
        lock(&self.commands).push(command);
        Ok(())
    }
}

impl TransportControls for MemoryTransport {
    fn play(&self) -> Result<(), QueueViewError> {
        self.record("play", TransportCommand::Play)
    }

    fn pause(&self) -> Result<(), QueueViewError> {
        self.record("pause", TransportCommand::Pause)
    }

    fn play_from_id(&self, id: &str) -> Result<(), QueueViewError> {
        self.record("play_from_id", TransportCommand::PlayFromId(id.to_string()))
    }

    fn skip_to_next(&self) -> Result<(), QueueViewError> {
        self.record("skip_to_next", TransportCommand::SkipToNext)
    }

    fn skip_to_previous(&self) -> Result<(), QueueViewError> {
        self.record("skip_to_previous", TransportCommand::SkipToPrevious)
    }
}

pub struct InMemorySession {
    root_id: String,
    started: AtomicBool,
    now_playing: LiveValue<NowPlaying>,
    playback_state: LiveValue<PlaybackSnapshot>,
    transport: MemoryTransport,
    catalogs: Mutex<HashMap<String, Vec<CatalogEntry>>>,
    subscribers: Mutex<Vec<(String, Arc<dyn CatalogSubscriber>)>>,
}

impl InMemorySession {
    /// New session with nothing playing and an empty playback state.
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            started: AtomicBool::new(false),
            now_playing: LiveValue::with_value(NowPlaying::nothing()),
            playback_state: LiveValue::with_value(PlaybackSnapshot::default()),
            transport: MemoryTransport::default(),
            catalogs: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::SeqCst);
    }

    pub fn set_now_playing(&self, now_playing: NowPlaying) {
        self.now_playing.set(now_playing);
    }

    pub fn set_playback_state(&self, snapshot: PlaybackSnapshot) {
        self.playback_state.set(snapshot);
    }

    pub fn transport(&self) -> &MemoryTransport {
        &self.transport
    }

    /// Stores the children of `queue_id` and delivers them to every current
    /// subscriber of that queue.
    pub fn load_children(&self, queue_id: &str, children: Vec<CatalogEntry>) {
        lock(&self.catalogs).insert(queue_id.to_string(), children.clone());

        let targets: Vec<Arc<dyn CatalogSubscriber>> = lock(&self.subscribers)
            .iter()
            .filter(|(id, _)| id == queue_id)
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in targets {
            subscriber.on_children_loaded(queue_id, children.clone());
        }
    }

    pub fn subscriber_count(&self, queue_id: &str) -> usize {
        lock(&self.subscribers)
            .iter()
            .filter(|(id, _)| id == queue_id)
            .count()
    }
}

impl MediaSessionConnection for InMemorySession {
    fn root_queue_id(&self) -> String {
        self.root_id.clone()
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn now_playing(&self) -> &LiveValue<NowPlaying> {
        &self.now_playing
    }

    fn playback_state(&self) -> &LiveValue<PlaybackSnapshot> {
        &self.playback_state
    }

    fn transport_controls(&self) -> &dyn TransportControls {
        &self.transport
    }

    fn subscribe(&self, queue_id: &str, subscriber: Arc<dyn CatalogSubscriber>) {
        lock(&self.subscribers).push((queue_id.to_string(), Arc::clone(&subscriber)));

        let known = lock(&self.catalogs).get(queue_id).cloned();
        if let Some(children) = known {
            subscriber.on_children_loaded(queue_id, children);
        }
    }

    fn unsubscribe(&self, queue_id: &str, subscriber: &Arc<dyn CatalogSubscriber>) {
        lock(&self.subscribers)
            .retain(|(id, registered)| !(id == queue_id && Arc::ptr_eq(registered, subscriber)));
    }
}

/// Preference store kept in memory.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.set_string(key, value);
        self
    }

    pub fn set_string(&self, key: &str, value: &str) {
        lock(&self.values).insert(key.to_string(), value.to_string());
    }
}

impl PreferenceReader for MemoryPreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }
}
