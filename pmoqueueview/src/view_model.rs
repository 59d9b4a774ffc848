//! Queue view model.
//!
//! A `QueueViewModel` attaches to a media session for one queue id and
//! republishes what a queue screen needs: the display items, the current
//! item, the playback state and a sampled playback position.
//!
//! ## Threading
//!
//! Each view model owns one worker thread. Session callbacks (catalog
//! loaded, playback state, now playing), local skip commands and the
//! position timer are all turned into signals handled by that thread, one
//! at a time. Outputs are therefore published from the worker thread.
//!
//! An output observer may call `dispose`; the worker is not joined in that
//! case, but it stops publishing and drops the signals still queued.
//!
//! ```text
//!  session observers ──┐
//!  catalog subscriber ─┼─> Signal channel ──> worker ──> LiveValue outputs
//!  skip / flush ───────┘        tick ──────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use pmoconfig::Config;
use tracing::{debug, error, info, warn};

use crate::capabilities::PlaybackSnapshot;
use crate::catalog::{
    build_display_items, initial_current_item, next_item, previous_item, recompute_catalog,
};
use crate::errors::QueueViewError;
use crate::live::{LiveValue, ObserverId};
use crate::model::{CatalogEntry, DisplayItem, NowPlaying};
use crate::session::{CatalogSubscriber, MediaSessionConnection, PreferenceReader};
use crate::settings::QueueViewSettings;
use crate::ticker::{PositionSampler, position_timer};

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum Signal {
    CatalogLoaded(Vec<CatalogEntry>),
    PlaybackStateChanged(PlaybackSnapshot),
    NowPlayingChanged(NowPlaying),
    SkipToNext,
    SkipToPrevious,
    Flush(Sender<()>),
    Shutdown,
}

/// Observable outputs of a view model.
#[derive(Clone, Default)]
pub struct QueueViewOutputs {
    pub items: LiveValue<Vec<DisplayItem>>,
    pub current_item: LiveValue<Option<DisplayItem>>,
    pub playback_state: LiveValue<PlaybackSnapshot>,
    /// Playback position in milliseconds.
    pub position: LiveValue<i64>,
    /// Internal consistency failures, such as a now-playing item missing
    /// from the catalog.
    pub faults: LiveValue<QueueViewError>,
}

/// Forwards the session's catalog deliveries for one queue to the worker.
struct QueueSubscriber {
    queue_id: String,
    tx: Sender<Signal>,
}

impl CatalogSubscriber for QueueSubscriber {
    fn on_children_loaded(&self, queue_id: &str, children: Vec<CatalogEntry>) {
        if queue_id != self.queue_id {
            debug!(queue = %self.queue_id, delivered = %queue_id, "Ignoring children of another queue");
            return;
        }
        let _ = self.tx.send(Signal::CatalogLoaded(children));
    }
}

struct Attachments {
    state_observer: ObserverId,
    metadata_observer: ObserverId,
    catalog_subscriber: Arc<dyn CatalogSubscriber>,
    worker: JoinHandle<()>,
}

pub struct QueueViewModel {
    queue_id: String,
    session: Arc<dyn MediaSessionConnection>,
    outputs: QueueViewOutputs,
    tx: Sender<Signal>,
    detached: Arc<AtomicBool>,
    attachments: Mutex<Option<Attachments>>,
}

impl QueueViewModel {
    /// Attaches a view model for `queue_id` to `session` and starts its
    /// worker and position poller.
    pub fn new(
        queue_id: impl Into<String>,
        preferences: Arc<dyn PreferenceReader>,
        session: Arc<dyn MediaSessionConnection>,
        settings: QueueViewSettings,
    ) -> Result<Self, QueueViewError> {
        settings.validate()?;
        let queue_id = queue_id.into();
        let outputs = QueueViewOutputs::default();
        let (tx, rx) = unbounded::<Signal>();
        let detached = Arc::new(AtomicBool::new(false));

        let worker = QueueViewWorker {
            queue_id: queue_id.clone(),
            detached: Arc::clone(&detached),
            session: Arc::clone(&session),
            preferences,
            settings,
            outputs: outputs.clone(),
            items: Vec::new(),
            catalog_loaded: false,
            current: None,
            playback: PlaybackSnapshot::default(),
            sampler: PositionSampler::new(),
        };
        let worker = thread::Builder::new()
            .name(format!("queue-view-{}", queue_id))
            .spawn(move || worker.run(rx))
            .map_err(|e| QueueViewError::WorkerSpawn(e.to_string()))?;

        let state_tx = tx.clone();
        let state_observer = session.playback_state().observe(move |snapshot| {
            let _ = state_tx.send(Signal::PlaybackStateChanged(snapshot.clone()));
        });

        let metadata_tx = tx.clone();
        let metadata_observer = session.now_playing().observe(move |metadata| {
            let _ = metadata_tx.send(Signal::NowPlayingChanged(metadata.clone()));
        });

        let catalog_subscriber: Arc<dyn CatalogSubscriber> = Arc::new(QueueSubscriber {
            queue_id: queue_id.clone(),
            tx: tx.clone(),
        });
        session.subscribe(&queue_id, Arc::clone(&catalog_subscriber));

        info!(queue = %queue_id, "Queue view attached");

        Ok(Self {
            queue_id,
            session,
            outputs,
            tx,
            detached,
            attachments: Mutex::new(Some(Attachments {
                state_observer,
                metadata_observer,
                catalog_subscriber,
                worker,
            })),
        })
    }

    /// Builds a view model whose preferences and settings come from `config`.
    pub fn from_config(
        queue_id: impl Into<String>,
        config: Arc<Config>,
        session: Arc<dyn MediaSessionConnection>,
    ) -> Result<Self, QueueViewError> {
        let settings = QueueViewSettings::from_config(&config);
        Self::new(queue_id, config, session, settings)
    }

    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    pub fn outputs(&self) -> &QueueViewOutputs {
        &self.outputs
    }

    pub fn items(&self) -> &LiveValue<Vec<DisplayItem>> {
        &self.outputs.items
    }

    pub fn current_item(&self) -> &LiveValue<Option<DisplayItem>> {
        &self.outputs.current_item
    }

    pub fn playback_state(&self) -> &LiveValue<PlaybackSnapshot> {
        &self.outputs.playback_state
    }

    pub fn position(&self) -> &LiveValue<i64> {
        &self.outputs.position
    }

    pub fn faults(&self) -> &LiveValue<QueueViewError> {
        &self.outputs.faults
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.attachments).is_none()
    }

    fn ensure_attached(&self) -> Result<(), QueueViewError> {
        if self.is_disposed() {
            return Err(QueueViewError::Disposed(self.queue_id.clone()));
        }
        Ok(())
    }

    fn send(&self, signal: Signal) -> Result<(), QueueViewError> {
        self.tx
            .send(signal)
            .map_err(|_| QueueViewError::Disposed(self.queue_id.clone()))
    }

    /// Plays `id`, or toggles play/pause when `id` is already the prepared
    /// now-playing item.
    pub fn play_or_toggle(&self, id: &str) -> Result<(), QueueViewError> {
        self.ensure_attached()?;
        let now_playing = self.session.now_playing().value_or_default();
        let state = self.session.playback_state().value_or_default();
        let transport = self.session.transport_controls();

        if now_playing.is(id) && state.is_prepared() {
            if state.is_playing_or_buffering() {
                debug!(queue = %self.queue_id, id, "Pausing now playing item");
                transport.pause()
            } else if state.is_play_enabled() {
                debug!(queue = %self.queue_id, id, "Resuming now playing item");
                transport.play()
            } else {
                warn!(
                    queue = %self.queue_id,
                    id,
                    state = state.state.as_str(),
                    "Playable item clicked but neither play nor pause are enabled"
                );
                Ok(())
            }
        } else {
            debug!(queue = %self.queue_id, id, "Playing from id");
            transport.play_from_id(id)
        }
    }

    /// Skips on the session when it is started, otherwise moves the current
    /// item forward in the local catalog.
    pub fn skip_to_next(&self) -> Result<(), QueueViewError> {
        self.ensure_attached()?;
        if self.session.is_started() {
            return self.session.transport_controls().skip_to_next();
        }
        self.send(Signal::SkipToNext)
    }

    /// Mirror of [`QueueViewModel::skip_to_next`]; the local move honours the
    /// configured `PreviousBoundary`.
    pub fn skip_to_previous(&self) -> Result<(), QueueViewError> {
        self.ensure_attached()?;
        if self.session.is_started() {
            return self.session.transport_controls().skip_to_previous();
        }
        self.send(Signal::SkipToPrevious)
    }

    /// Blocks until every signal queued before this call has been handled.
    ///
    /// Returns immediately when called from an output observer, since those
    /// run on the worker itself.
    pub fn flush(&self) -> Result<(), QueueViewError> {
        {
            let attachments = lock(&self.attachments);
            match attachments.as_ref() {
                None => return Err(QueueViewError::Disposed(self.queue_id.clone())),
                Some(a) if a.worker.thread().id() == thread::current().id() => return Ok(()),
                Some(_) => {}
            }
        }
        let (reply_tx, reply_rx) = bounded::<()>(1);
        self.send(Signal::Flush(reply_tx))?;
        reply_rx
            .recv()
            .map_err(|_| QueueViewError::Disposed(self.queue_id.clone()))
    }

    /// Detaches from the session and stops the worker. Later calls do
    /// nothing. No output is published once this returns.
    pub fn dispose(&self) {
        let Some(attachments) = lock(&self.attachments).take() else {
            debug!(queue = %self.queue_id, "Queue view already disposed");
            return;
        };

        self.session
            .playback_state()
            .remove_observer(attachments.state_observer);
        self.session
            .now_playing()
            .remove_observer(attachments.metadata_observer);
        self.session
            .unsubscribe(&self.queue_id, &attachments.catalog_subscriber);

        self.detached.store(true, Ordering::Release);
        let _ = self.tx.send(Signal::Shutdown);
        if attachments.worker.thread().id() == thread::current().id() {
            warn!(queue = %self.queue_id, "Queue view disposed from its own worker");
        } else if attachments.worker.join().is_err() {
            error!(queue = %self.queue_id, "Queue view worker panicked");
        }

        info!(queue = %self.queue_id, "Queue view detached");
    }
}

impl Drop for QueueViewModel {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// State owned by the worker thread.
struct QueueViewWorker {
    queue_id: String,
    /// Set by `dispose`; nothing is published once it is raised.
    detached: Arc<AtomicBool>,
    session: Arc<dyn MediaSessionConnection>,
    preferences: Arc<dyn PreferenceReader>,
    settings: QueueViewSettings,
    outputs: QueueViewOutputs,
    items: Vec<DisplayItem>,
    catalog_loaded: bool,
    current: Option<DisplayItem>,
    /// Latest playback state seen through the session observer.
    playback: PlaybackSnapshot,
    sampler: PositionSampler,
}

impl QueueViewWorker {
    fn run(mut self, rx: Receiver<Signal>) {
        let timer = position_timer(self.settings.position_poll_interval);
        debug!(
            queue = %self.queue_id,
            interval_ms = self.settings.position_poll_interval.as_millis() as u64,
            "Queue view worker started"
        );

        loop {
            select! {
                recv(rx) -> signal => match signal {
                    Ok(Signal::Shutdown) | Err(_) => break,
                    Ok(signal) => self.handle(signal),
                },
                recv(timer) -> _ => self.sample_position(),
            }
            if self.is_detached() {
                break;
            }
        }

        debug!(queue = %self.queue_id, "Queue view worker stopped");
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn publish<T: Clone + Send + 'static>(&self, output: &LiveValue<T>, value: T) {
        if !self.is_detached() {
            output.set(value);
        }
    }

    fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::CatalogLoaded(children) => self.on_catalog_loaded(children),
            Signal::PlaybackStateChanged(snapshot) => self.on_playback_state(snapshot),
            Signal::NowPlayingChanged(metadata) => self.on_now_playing(metadata),
            Signal::SkipToNext => {
                let next = next_item(&self.items, self.current.as_ref());
                self.move_current(next);
            }
            Signal::SkipToPrevious => {
                let previous = previous_item(
                    &self.items,
                    self.current.as_ref(),
                    self.settings.previous_boundary,
                );
                self.move_current(previous);
            }
            Signal::Flush(reply) => {
                let _ = reply.send(());
            }
            Signal::Shutdown => {}
        }
    }

    fn on_catalog_loaded(&mut self, children: Vec<CatalogEntry>) {
        let now_playing = self.session.now_playing().value_or_default();
        let state = self.session.playback_state().value_or_default();

        let items = build_display_items(children, &now_playing, &state);
        let last_played = self.preferences.get_string(&self.settings.last_played_key);
        let current = initial_current_item(&items, last_played.as_deref());

        debug!(
            queue = %self.queue_id,
            count = items.len(),
            current = current.as_ref().map(|i| i.id()).unwrap_or("-"),
            "Queue catalog loaded"
        );

        self.items = items;
        self.catalog_loaded = true;
        self.current = current.clone();
        self.publish(&self.outputs.current_item, current);
        self.publish(&self.outputs.items, self.items.clone());
    }

    fn on_playback_state(&mut self, snapshot: PlaybackSnapshot) {
        self.playback = snapshot.clone();
        self.publish(&self.outputs.playback_state, snapshot);

        let metadata = self.session.now_playing().value_or_default();
        if metadata.id.is_some() {
            self.recompute(&metadata);
        }
    }

    fn on_now_playing(&mut self, metadata: NowPlaying) {
        if metadata.id.is_none() {
            debug!(queue = %self.queue_id, "Nothing playing");
            return;
        }
        self.recompute(&metadata);
    }

    fn recompute(&mut self, metadata: &NowPlaying) {
        let update = match recompute_catalog(
            &self.items,
            &self.playback,
            metadata,
            &self.queue_id,
            self.catalog_loaded,
        ) {
            Ok(update) => update,
            Err(err) => {
                error!(queue = %self.queue_id, error = %err, "Queue catalog update rejected");
                self.publish(&self.outputs.faults, err);
                return;
            }
        };

        self.items = update.items;
        match update.current_item {
            Some(current) => {
                self.current = Some(current.clone());
                self.publish(&self.outputs.current_item, Some(current));
            }
            None => self.refresh_current(),
        }
        self.publish(&self.outputs.items, self.items.clone());
    }

    /// Re-points the current item at its counterpart in the new catalog.
    fn refresh_current(&mut self) {
        let Some(current) = self.current.as_ref() else {
            return;
        };
        let Some(fresh) = self.items.iter().find(|item| item.id() == current.id()) else {
            return;
        };
        if fresh != current {
            let fresh = fresh.clone();
            self.current = Some(fresh.clone());
            self.publish(&self.outputs.current_item, Some(fresh));
        }
    }

    fn move_current(&mut self, target: Option<DisplayItem>) {
        if let Some(item) = target {
            debug!(queue = %self.queue_id, id = item.id(), "Current queue item moved");
            self.current = Some(item.clone());
            self.publish(&self.outputs.current_item, Some(item));
        }
    }

    fn sample_position(&mut self) {
        if let Some(position) = self.sampler.sample_snapshot(&self.playback, Instant::now()) {
            self.publish(&self.outputs.position, position);
        }
    }
}
