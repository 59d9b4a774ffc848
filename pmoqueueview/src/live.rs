//! Last-value cached observable holder.
//!
//! A `LiveValue` keeps the most recent value and pushes every update to two
//! kinds of listeners:
//!   - callback observers (`observe` / `remove_observer`), invoked on the
//!     thread that calls `set`,
//!   - channel subscribers (`subscribe`), fed through crossbeam channels.
//!
//! New listeners immediately receive the current value if one was set.
//! Observers must not call `set` on the same holder from inside their
//! callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender, unbounded};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: Mutex<Option<T>>,
    observers: Mutex<Vec<(ObserverId, Observer<T>)>>,
    subscribers: Mutex<Vec<Sender<T>>>,
    /// Serializes notifications so listeners see updates in `set` order.
    emit: Mutex<()>,
    next_id: AtomicU64,
}

pub struct LiveValue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for LiveValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Default for LiveValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Clone + Send + 'static> LiveValue<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                value: Mutex::new(None),
                observers: Mutex::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
                emit: Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn with_value(value: T) -> Self {
        let live = Self::new();
        *lock(&live.shared.value) = Some(value);
        live
    }

    /// Synchronous read of the cached value.
    pub fn value(&self) -> Option<T> {
        lock(&self.shared.value).clone()
    }

    pub fn value_or_default(&self) -> T
    where
        T: Default,
    {
        self.value().unwrap_or_default()
    }

    pub fn has_value(&self) -> bool {
        lock(&self.shared.value).is_some()
    }

    /// Stores `value` and notifies every listener.
    pub fn set(&self, value: T) {
        let _emit = lock(&self.shared.emit);
        *lock(&self.shared.value) = Some(value.clone());

        {
            let mut subscribers = lock(&self.shared.subscribers);
            subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        }

        let observers: Vec<Observer<T>> = lock(&self.shared.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(&value);
        }
    }

    /// Registers a callback observer; it is called right away with the
    /// current value, if any.
    pub fn observe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _emit = lock(&self.shared.emit);
        let id = ObserverId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let observer: Observer<T> = Arc::new(observer);
        lock(&self.shared.observers).push((id, Arc::clone(&observer)));

        if let Some(current) = self.value() {
            observer(&current);
        }
        id
    }

    /// Returns `false` when the observer was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = lock(&self.shared.observers);
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.shared.observers).len()
    }

    /// Channel subscription. The receiver gets the current value first;
    /// dropping it unsubscribes on the next `set`.
    pub fn subscribe(&self) -> Receiver<T> {
        let _emit = lock(&self.shared.emit);
        let (tx, rx) = unbounded::<T>();
        if let Some(current) = self.value() {
            let _ = tx.send(current);
        }
        lock(&self.shared.subscribers).push(tx);
        rx
    }
}
